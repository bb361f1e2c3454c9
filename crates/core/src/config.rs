use serde::Deserialize;

use crate::error::{BanditError, BanditResult};

/// Root configuration. Loaded from environment variables with the prefix
/// `BANDIT__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub linucb: LinUcbConfig,
    #[serde(default)]
    pub logistic_ts: LogisticTsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Hyperparameters of the linear UCB policy.
#[derive(Debug, Clone, Deserialize)]
pub struct LinUcbConfig {
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    #[serde(default = "default_n_arms")]
    pub n_arms: usize,
    /// Observation noise standard deviation.
    #[serde(default = "default_sigma")]
    pub sigma: f64,
    /// Exploration coefficient on the confidence bonus.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Prior standard deviation of the coefficients.
    #[serde(default = "default_sigma_0")]
    pub sigma_0: f64,
}

/// Hyperparameters of the logistic Thompson-sampling policy.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticTsConfig {
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    #[serde(default = "default_sigma_0")]
    pub sigma_0: f64,
    #[serde(default = "default_max_newton_iterations")]
    pub max_newton_iterations: usize,
    #[serde(default = "default_convergence_tolerance")]
    pub convergence_tolerance: f64,
    /// Number of observations between two posterior refits.
    #[serde(default = "default_refit_interval")]
    pub refit_interval: u64,
    /// Seed for posterior sampling. `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    #[default]
    Linucb,
    LogisticTs,
}

/// Settings for the synthetic environment driven by `bandit-sim`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default = "default_rounds")]
    pub rounds: u64,
    #[serde(default = "default_n_arms")]
    pub n_arms: usize,
    #[serde(default = "default_n_features")]
    pub n_features: usize,
    /// Gaussian reward noise for the linear environment.
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_warmup_rounds")]
    pub warmup_rounds: u64,
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

// Default functions
fn default_n_features() -> usize {
    4
}
fn default_n_arms() -> usize {
    5
}
fn default_sigma() -> f64 {
    1.0
}
fn default_alpha() -> f64 {
    0.01
}
fn default_sigma_0() -> f64 {
    0.1
}
fn default_max_newton_iterations() -> usize {
    1000
}
fn default_convergence_tolerance() -> f64 {
    0.01
}
fn default_refit_interval() -> u64 {
    100
}
fn default_rounds() -> u64 {
    1000
}
fn default_noise_std() -> f64 {
    0.1
}
fn default_seed() -> u64 {
    42
}
fn default_warmup_rounds() -> u64 {
    2
}
fn default_report_every() -> u64 {
    100
}

impl Default for LinUcbConfig {
    fn default() -> Self {
        Self {
            n_features: default_n_features(),
            n_arms: default_n_arms(),
            sigma: default_sigma(),
            alpha: default_alpha(),
            sigma_0: default_sigma_0(),
        }
    }
}

impl Default for LogisticTsConfig {
    fn default() -> Self {
        Self {
            n_features: default_n_features(),
            sigma_0: default_sigma_0(),
            max_newton_iterations: default_max_newton_iterations(),
            convergence_tolerance: default_convergence_tolerance(),
            refit_interval: default_refit_interval(),
            seed: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            rounds: default_rounds(),
            n_arms: default_n_arms(),
            n_features: default_n_features(),
            noise_std: default_noise_std(),
            seed: default_seed(),
            warmup_rounds: default_warmup_rounds(),
            report_every: default_report_every(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            linucb: LinUcbConfig::default(),
            logistic_ts: LogisticTsConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> BanditResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BanditError::InvalidArgument(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

pub(crate) fn require_nonzero(name: &str, value: u64) -> BanditResult<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(BanditError::InvalidArgument(format!(
            "{name} must be a positive integer, got {value}"
        )))
    }
}

impl LinUcbConfig {
    pub fn new(n_features: usize, n_arms: usize) -> Self {
        Self {
            n_features,
            n_arms,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> BanditResult<()> {
        require_nonzero("n_features", self.n_features as u64)?;
        require_nonzero("n_arms", self.n_arms as u64)?;
        require_positive("sigma", self.sigma)?;
        require_positive("alpha", self.alpha)?;
        require_positive("sigma_0", self.sigma_0)
    }
}

impl LogisticTsConfig {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> BanditResult<()> {
        require_nonzero("n_features", self.n_features as u64)?;
        require_positive("sigma_0", self.sigma_0)?;
        require_nonzero("max_newton_iterations", self.max_newton_iterations as u64)?;
        require_positive("convergence_tolerance", self.convergence_tolerance)?;
        require_nonzero("refit_interval", self.refit_interval)
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> BanditResult<()> {
        require_nonzero("rounds", self.rounds)?;
        require_nonzero("n_arms", self.n_arms as u64)?;
        require_nonzero("n_features", self.n_features as u64)?;
        require_positive("noise_std", self.noise_std)?;
        require_nonzero("report_every", self.report_every)
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder(None).build()?.try_deserialize()
    }

    /// Load configuration from a TOML file, with environment variables
    /// taking precedence over file values.
    pub fn load_from(path: &str) -> Result<Self, config::ConfigError> {
        Self::builder(Some(path)).build()?.try_deserialize()
    }

    fn builder(
        path: Option<&str>,
    ) -> config::ConfigBuilder<config::builder::DefaultState> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::with_name(path).format(config::FileFormat::Toml),
            );
        }
        builder.add_source(
            config::Environment::with_prefix("BANDIT")
                .separator("__")
                .try_parsing(true),
        )
    }

    pub fn validate(&self) -> BanditResult<()> {
        self.linucb.validate()?;
        self.logistic_ts.validate()?;
        self.simulation.validate()
    }
}
