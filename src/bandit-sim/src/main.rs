//! bandit-sim: runs a contextual bandit policy against a synthetic reward
//! environment and prints a JSON summary of reward and regret.

mod environment;
mod runner;

use anyhow::Context;
use bandit_core::config::{AppConfig, PolicyKind};
use bandit_rl_engine::{ContextualPolicy, LinUcbAgent, LogisticTsAgent};
use clap::{Parser, ValueEnum};
use tracing::info;

use crate::environment::{Environment, RewardModel};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Linucb,
    #[value(alias = "logistic_ts")]
    LogisticTs,
}

impl From<PolicyArg> for PolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Linucb => PolicyKind::Linucb,
            PolicyArg::LogisticTs => PolicyKind::LogisticTs,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "bandit-sim")]
#[command(about = "Simulate LinUCB or logistic Thompson sampling on a synthetic contextual bandit")]
#[command(version)]
struct Cli {
    /// TOML config file (environment variables still take precedence)
    #[arg(long, env = "BANDIT_CONFIG")]
    config: Option<String>,

    /// Policy to run (overrides config)
    #[arg(long, value_enum, env = "BANDIT__SIMULATION__POLICY")]
    policy: Option<PolicyArg>,

    /// Number of rounds (overrides config)
    #[arg(long, env = "BANDIT__SIMULATION__ROUNDS")]
    rounds: Option<u64>,

    /// Number of arms (overrides config)
    #[arg(long, env = "BANDIT__SIMULATION__N_ARMS")]
    arms: Option<usize>,

    /// Feature dimension (overrides config)
    #[arg(long, env = "BANDIT__SIMULATION__N_FEATURES")]
    features: Option<usize>,

    /// Environment seed (overrides config)
    #[arg(long, env = "BANDIT__SIMULATION__SEED")]
    seed: Option<u64>,
}

/// An explicitly named config file must load. Without one, a broken
/// environment layer falls back to defaults.
fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config file {path}")),
        None => Ok(AppConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            AppConfig::default()
        })),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bandit_sim=info,bandit_rl_engine=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(policy) = cli.policy {
        config.simulation.policy = policy.into();
    }
    if let Some(rounds) = cli.rounds {
        config.simulation.rounds = rounds;
    }
    if let Some(arms) = cli.arms {
        config.simulation.n_arms = arms;
    }
    if let Some(features) = cli.features {
        config.simulation.n_features = features;
    }
    if let Some(seed) = cli.seed {
        config.simulation.seed = seed;
    }

    // The environment decides the problem shape.
    let sim = config.simulation.clone();
    config.linucb.n_arms = sim.n_arms;
    config.linucb.n_features = sim.n_features;
    config.logistic_ts.n_features = sim.n_features;
    if config.logistic_ts.seed.is_none() {
        config.logistic_ts.seed = Some(sim.seed);
    }
    config.validate()?;

    info!(
        policy = ?sim.policy,
        rounds = sim.rounds,
        n_arms = sim.n_arms,
        n_features = sim.n_features,
        seed = sim.seed,
        "Configuration loaded"
    );

    let (mut policy, reward_model): (Box<dyn ContextualPolicy>, RewardModel) = match sim.policy {
        PolicyKind::Linucb => (
            Box::new(LinUcbAgent::new(&config.linucb)?) as Box<dyn ContextualPolicy>,
            RewardModel::Linear {
                noise_std: sim.noise_std,
            },
        ),
        PolicyKind::LogisticTs => (
            Box::new(LogisticTsAgent::new(&config.logistic_ts)?) as Box<dyn ContextualPolicy>,
            RewardModel::Bernoulli,
        ),
    };

    let mut env = Environment::new(sim.n_arms, sim.n_features, reward_model, sim.seed)?;
    tracing::debug!(theta_star = ?env.theta_star().as_slice(), "Environment ready");
    let report = runner::run(policy.as_mut(), &mut env, &sim)?;

    info!(
        cumulative_reward = report.cumulative_reward,
        cumulative_regret = report.cumulative_regret,
        "Simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_is_an_error() {
        let err = load_config(Some("/nonexistent/bandit-sim.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/bandit-sim.toml"));
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("bandit-sim-{}.toml", std::process::id()));
        std::fs::write(&path, "[simulation\nrounds = ").unwrap();
        let result = load_config(path.to_str());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
