//! Drives a policy against the synthetic environment and tallies reward and
//! regret.

use bandit_core::config::SimulationConfig;
use bandit_core::{BanditError, BanditResult};
use bandit_rl_engine::ContextualPolicy;
use nalgebra::DVector;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::environment::Environment;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub policy: &'static str,
    pub rounds: u64,
    pub n_arms: usize,
    pub n_features: usize,
    pub cumulative_reward: f64,
    pub cumulative_regret: f64,
    pub mean_regret: f64,
    /// Rounds where the arm came from the round-robin fallback.
    pub fallback_rounds: u64,
    pub final_iteration: u64,
}

pub fn run(
    policy: &mut dyn ContextualPolicy,
    env: &mut Environment,
    config: &SimulationConfig,
) -> BanditResult<SimulationReport> {
    let mut cumulative_reward = 0.0;
    let mut cumulative_regret = 0.0;
    let mut fallback_rounds = 0;

    for round in 0..config.rounds {
        let contexts = env.contexts();
        let round_robin = (round % config.n_arms as u64) as usize;

        let arm = if round < config.warmup_rounds {
            fallback_rounds += 1;
            round_robin
        } else {
            match policy.select_arm(&contexts) {
                Ok(arm) => arm,
                Err(BanditError::NumericDegeneracy(reason)) => {
                    warn!(round, %reason, "policy could not score arms, playing round-robin");
                    fallback_rounds += 1;
                    round_robin
                }
                Err(e) => return Err(e),
            }
        };

        let reward = env.pull(&contexts, arm);
        let regret = env.regret(&contexts, arm);
        cumulative_reward += reward;
        cumulative_regret += regret;

        let chosen: DVector<f64> = contexts.row(arm).transpose();
        policy.sample(&chosen, reward)?;

        debug!(round, arm, reward, regret, "round played");
        if (round + 1) % config.report_every == 0 {
            info!(
                policy = policy.name(),
                round = round + 1,
                cumulative_reward,
                cumulative_regret,
                "simulation progress"
            );
        }
    }

    Ok(SimulationReport {
        policy: policy.name(),
        rounds: config.rounds,
        n_arms: config.n_arms,
        n_features: config.n_features,
        cumulative_reward,
        cumulative_regret,
        mean_regret: cumulative_regret / config.rounds as f64,
        fallback_rounds,
        final_iteration: policy.iteration(),
    })
}
