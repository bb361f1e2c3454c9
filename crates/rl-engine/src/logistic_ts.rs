//! Logistic Thompson Sampling with a Laplace-approximated posterior.
//!
//! The MAP estimate and the inverse Hessian of the negative log-posterior are
//! refit by Newton-Raphson over the full observation history every
//! `refit_interval` observations. Between refits the posterior is frozen and
//! only the history grows.

use bandit_core::config::LogisticTsConfig;
use bandit_core::{BanditError, BanditResult};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::counter::IterationCounter;
use crate::policy::{self, ContextualPolicy};

/// Below this argument the logistic link is clamped to zero.
const LOGISTIC_UNDERFLOW: f64 = -500.0;

/// Outcome of one Newton-Raphson refit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefitReport {
    /// Newton steps taken.
    pub iterations: usize,
    /// Whether the last step fell below the convergence tolerance.
    pub converged: bool,
    /// Euclidean norm of the last step.
    pub step_norm: f64,
}

#[derive(Debug, Clone)]
pub struct LogisticTsAgent {
    config: LogisticTsConfig,
    counter: IterationCounter,
    theta: DVector<f64>,
    h_inv: DMatrix<f64>,
    /// Lower Cholesky factor of `h_inv`, used to draw posterior samples.
    covariance_factor: DMatrix<f64>,
    context_history: Vec<DVector<f64>>,
    reward_history: Vec<f64>,
    refit_count: u64,
    last_refit: Option<RefitReport>,
    rng: StdRng,
}

/// `1 / (1 + e^-x)`, or zero when `x < -500`.
pub fn logistic_link(x: f64) -> f64 {
    if x < LOGISTIC_UNDERFLOW {
        0.0
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}

fn invert_spd(matrix: DMatrix<f64>) -> BanditResult<DMatrix<f64>> {
    let inverse = matrix
        .cholesky()
        .map(|chol| chol.inverse())
        .ok_or_else(|| {
            BanditError::SingularMatrix("Hessian is not positive definite".to_string())
        })?;
    if inverse.iter().any(|x| !x.is_finite()) {
        return Err(BanditError::SingularMatrix(
            "Hessian inverse has non-finite entries".to_string(),
        ));
    }
    Ok(inverse)
}

fn lower_factor(covariance: &DMatrix<f64>) -> BanditResult<DMatrix<f64>> {
    covariance
        .clone()
        .cholesky()
        .map(|chol| chol.l())
        .ok_or_else(|| {
            BanditError::SingularMatrix("posterior covariance is not positive definite".to_string())
        })
}

impl LogisticTsAgent {
    pub fn new(config: &LogisticTsConfig) -> BanditResult<Self> {
        config.validate()?;

        let d = config.n_features;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut agent = Self {
            config: config.clone(),
            counter: IterationCounter::new(),
            theta: DVector::zeros(d),
            h_inv: DMatrix::zeros(d, d),
            covariance_factor: DMatrix::zeros(d, d),
            context_history: Vec::new(),
            reward_history: Vec::new(),
            refit_count: 0,
            last_refit: None,
            rng,
        };
        agent.h_inv = agent.hessian_inverse(&agent.theta)?;
        agent.covariance_factor = lower_factor(&agent.h_inv)?;

        info!(
            n_features = d,
            sigma_0 = config.sigma_0,
            refit_interval = config.refit_interval,
            seeded = config.seed.is_some(),
            "Logistic TS agent initialized"
        );

        Ok(agent)
    }

    pub fn config(&self) -> &LogisticTsConfig {
        &self.config
    }

    pub fn theta(&self) -> &DVector<f64> {
        &self.theta
    }

    pub fn hessian_inv(&self) -> &DMatrix<f64> {
        &self.h_inv
    }

    pub fn context_history(&self) -> &[DVector<f64>] {
        &self.context_history
    }

    pub fn reward_history(&self) -> &[f64] {
        &self.reward_history
    }

    pub fn history_len(&self) -> usize {
        self.reward_history.len()
    }

    pub fn refit_count(&self) -> u64 {
        self.refit_count
    }

    pub fn last_refit(&self) -> Option<RefitReport> {
        self.last_refit
    }

    /// Restart the sampling stream from `seed`.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Gradient and Hessian of the negative log-posterior at `theta`,
    /// accumulated in one pass over the history.
    fn newton_terms(&self, theta: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
        let d = self.config.n_features;
        let prior_precision = self.config.sigma_0.powi(2).recip();
        let prior = (
            theta * prior_precision,
            DMatrix::identity(d, d) * prior_precision,
        );

        self.context_history
            .iter()
            .zip(&self.reward_history)
            .fold(prior, |(mut g, mut h), (context, &reward)| {
                let p = logistic_link(theta.dot(context));
                g.axpy(p - reward, context, 1.0);
                h.ger(p * (1.0 - p), context, context, 1.0);
                (g, h)
            })
    }

    /// Gradient of the negative log-posterior.
    pub fn gradient(&self, theta: &DVector<f64>) -> BanditResult<DVector<f64>> {
        policy::check_vector("theta", theta, self.config.n_features)?;
        Ok(self.newton_terms(theta).0)
    }

    /// Inverse Hessian of the negative log-posterior. Fails with
    /// `SingularMatrix` when the Hessian cannot be inverted.
    pub fn hessian_inverse(&self, theta: &DVector<f64>) -> BanditResult<DMatrix<f64>> {
        policy::check_vector("theta", theta, self.config.n_features)?;
        invert_spd(self.newton_terms(theta).1)
    }

    /// Newton-Raphson from the current `theta` over the whole history.
    ///
    /// Running out of iterations is not an error: a warning is logged and the
    /// last iterate is kept. The stored posterior is only replaced once every
    /// step has succeeded.
    pub fn refit_posterior(&mut self) -> BanditResult<RefitReport> {
        let max_iterations = self.config.max_newton_iterations;
        let tolerance = self.config.convergence_tolerance;

        let mut theta = self.theta.clone();
        let mut report = RefitReport {
            iterations: 0,
            converged: false,
            step_norm: f64::INFINITY,
        };

        for i in 0..max_iterations {
            let (gradient, hessian) = self.newton_terms(&theta);
            let step = invert_spd(hessian)? * gradient;
            theta -= &step;

            report.iterations = i + 1;
            report.step_norm = step.norm();
            if report.step_norm < tolerance {
                report.converged = true;
                break;
            }
        }

        if theta.iter().any(|x| !x.is_finite()) {
            return Err(BanditError::NumericDegeneracy(
                "Newton-Raphson produced a non-finite estimate".to_string(),
            ));
        }

        if !report.converged {
            warn!(
                iterations = report.iterations,
                step_norm = report.step_norm,
                tolerance,
                "ConvergenceWarning: Newton-Raphson hit the iteration cap, keeping last estimate"
            );
        }

        let h_inv = self.hessian_inverse(&theta)?;
        let covariance_factor = lower_factor(&h_inv)?;

        self.theta = theta;
        self.h_inv = h_inv;
        self.covariance_factor = covariance_factor;
        self.refit_count += 1;
        self.last_refit = Some(report);

        info!(
            iteration = self.counter.get(),
            history = self.history_len(),
            newton_iterations = report.iterations,
            converged = report.converged,
            "Logistic TS posterior refit"
        );

        Ok(report)
    }

    /// One draw from `N(theta, h_inv)`.
    pub fn sample_theta(&mut self) -> DVector<f64> {
        let d = self.config.n_features;
        let z: DVector<f64> = DVector::from_fn(d, |_, _| StandardNormal.sample(&mut self.rng));
        &self.theta + &self.covariance_factor * z
    }

    pub fn select_arm(&mut self, contexts: &DMatrix<f64>) -> BanditResult<usize> {
        policy::check_contexts(contexts, None, self.config.n_features)?;

        let theta_tilde = self.sample_theta();
        let scores = contexts * theta_tilde;
        let arm = policy::argmax_first(&scores)?;
        debug!(
            iteration = self.counter.get(),
            arm,
            score = scores[arm],
            "Logistic TS arm selected"
        );
        Ok(arm)
    }

    /// Record one observation. Every `refit_interval`-th observation triggers
    /// a refit, whose report is returned.
    pub fn sample(
        &mut self,
        chosen_context: &DVector<f64>,
        reward: f64,
    ) -> BanditResult<Option<RefitReport>> {
        policy::check_vector("chosen context", chosen_context, self.config.n_features)?;
        policy::check_reward(reward)?;

        let iteration = self.counter.advance()?;
        self.context_history.push(chosen_context.clone());
        self.reward_history.push(reward);

        if iteration % self.config.refit_interval == 0 {
            return self.refit_posterior().map(Some);
        }
        Ok(None)
    }
}

impl ContextualPolicy for LogisticTsAgent {
    fn name(&self) -> &'static str {
        "logistic_ts"
    }

    fn n_features(&self) -> usize {
        self.config.n_features
    }

    fn iteration(&self) -> u64 {
        self.counter.get()
    }

    fn set_iteration(&mut self, t: u64) -> BanditResult<()> {
        self.counter.set(t)
    }

    fn select_arm(&mut self, contexts: &DMatrix<f64>) -> BanditResult<usize> {
        LogisticTsAgent::select_arm(self, contexts)
    }

    fn sample(&mut self, chosen_context: &DVector<f64>, reward: f64) -> BanditResult<()> {
        LogisticTsAgent::sample(self, chosen_context, reward).map(|_| ())
    }
}
