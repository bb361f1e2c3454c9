//! Linear Upper Confidence Bound policy with a Bayesian linear-Gaussian
//! posterior over a reward model shared by all arms.

use bandit_core::config::LinUcbConfig;
use bandit_core::{BanditError, BanditResult};
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info};

use crate::counter::IterationCounter;
use crate::policy::{self, ContextualPolicy};

/// LinUCB agent.
///
/// `a_inv` is the inverse of the regularized design matrix and doubles as the
/// posterior covariance; `b` accumulates reward-weighted contexts, so the
/// posterior mean is `a_inv * b`.
#[derive(Debug, Clone)]
pub struct LinUcbAgent {
    config: LinUcbConfig,
    counter: IterationCounter,
    a_inv: DMatrix<f64>,
    b: DVector<f64>,
}

impl LinUcbAgent {
    pub fn new(config: &LinUcbConfig) -> BanditResult<Self> {
        config.validate()?;

        let d = config.n_features;
        let prior_scale = config.sigma_0.powi(2) / config.sigma.powi(2);

        info!(
            n_features = d,
            n_arms = config.n_arms,
            sigma = config.sigma,
            alpha = config.alpha,
            sigma_0 = config.sigma_0,
            "LinUCB agent initialized"
        );

        Ok(Self {
            config: config.clone(),
            counter: IterationCounter::new(),
            a_inv: DMatrix::identity(d, d) * prior_scale,
            b: DVector::zeros(d),
        })
    }

    pub fn config(&self) -> &LinUcbConfig {
        &self.config
    }

    pub fn n_arms(&self) -> usize {
        self.config.n_arms
    }

    pub fn a_inv(&self) -> &DMatrix<f64> {
        &self.a_inv
    }

    pub fn b(&self) -> &DVector<f64> {
        &self.b
    }

    /// Posterior mean and covariance of the coefficients.
    pub fn score_posterior(&self) -> (DVector<f64>, DMatrix<f64>) {
        (&self.a_inv * &self.b, self.a_inv.clone())
    }

    /// Project the posterior onto each arm's context (one row per arm).
    /// Returns the predicted reward means and their covariance.
    pub fn predict(&self, contexts: &DMatrix<f64>) -> BanditResult<(DVector<f64>, DMatrix<f64>)> {
        policy::check_contexts(contexts, Some(self.config.n_arms), self.config.n_features)?;

        let (mean, covariance) = self.score_posterior();
        let pred_mean = contexts * mean;
        let pred_cov = contexts * covariance * contexts.transpose();
        Ok((pred_mean, pred_cov))
    }

    /// Upper confidence bound of every arm.
    ///
    /// The bonus scales with `sqrt(ln(iteration))`, so at least two rounds must
    /// have been observed; earlier calls fail with `NumericDegeneracy`.
    pub fn ucb_score(&self, contexts: &DMatrix<f64>) -> BanditResult<DVector<f64>> {
        let iteration = self.counter.get();
        if iteration <= 1 {
            return Err(BanditError::NumericDegeneracy(format!(
                "UCB bonus needs iteration > 1, got {iteration}"
            )));
        }

        let alpha_t = self.config.alpha * (iteration as f64).ln().sqrt();
        let (pred_mean, pred_cov) = self.predict(contexts)?;

        // Rounding can leave a tiny negative variance on the diagonal.
        let bonus = pred_cov.diagonal().map(|v| v.max(0.0).sqrt());
        Ok(pred_mean + bonus * alpha_t)
    }

    pub fn select_arm(&self, contexts: &DMatrix<f64>) -> BanditResult<usize> {
        let scores = self.ucb_score(contexts)?;
        let arm = policy::argmax_first(&scores)?;
        debug!(
            iteration = self.counter.get(),
            arm,
            score = scores[arm],
            "LinUCB arm selected"
        );
        Ok(arm)
    }

    /// Rank-one Sherman-Morrison step: the returned `a_inv` is the inverse of
    /// `A + a a^T / sigma^2`, and `b` gains `a * reward / sigma^2`.
    fn posterior_step(
        &self,
        chosen_context: &DVector<f64>,
        reward: f64,
    ) -> BanditResult<(DMatrix<f64>, DVector<f64>)> {
        policy::check_vector("chosen context", chosen_context, self.config.n_features)?;
        policy::check_reward(reward)?;

        let noise_var = self.config.sigma.powi(2);
        let a_inv_a = &self.a_inv * chosen_context;
        let denom = noise_var + chosen_context.dot(&a_inv_a);
        if !denom.is_finite() || denom <= 0.0 {
            return Err(BanditError::SingularMatrix(format!(
                "Sherman-Morrison denominator is {denom}"
            )));
        }

        let updated = &self.a_inv - (&a_inv_a * a_inv_a.transpose()) / denom;
        let a_inv = (&updated + updated.transpose()) * 0.5;
        let b = &self.b + chosen_context * (reward / noise_var);
        if a_inv.iter().chain(b.iter()).any(|x| !x.is_finite()) {
            return Err(BanditError::SingularMatrix(
                "posterior update produced non-finite entries".to_string(),
            ));
        }
        Ok((a_inv, b))
    }

    /// Fold one observation into the posterior. Leaves the state untouched
    /// on error.
    pub fn update(&mut self, chosen_context: &DVector<f64>, reward: f64) -> BanditResult<()> {
        let (a_inv, b) = self.posterior_step(chosen_context, reward)?;
        self.a_inv = a_inv;
        self.b = b;
        debug!(iteration = self.counter.get(), reward, "LinUCB posterior updated");
        Ok(())
    }

    /// Advance the round counter and update the posterior. Either both
    /// happen or neither does.
    pub fn sample(&mut self, chosen_context: &DVector<f64>, reward: f64) -> BanditResult<()> {
        let (a_inv, b) = self.posterior_step(chosen_context, reward)?;
        self.counter.advance()?;
        self.a_inv = a_inv;
        self.b = b;
        debug!(iteration = self.counter.get(), reward, "LinUCB posterior updated");
        Ok(())
    }
}

impl ContextualPolicy for LinUcbAgent {
    fn name(&self) -> &'static str {
        "linucb"
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
        LinUcbAgent::select_arm(self, contexts)
    }

    fn sample(&mut self, chosen_context: &DVector<f64>, reward: f64) -> BanditResult<()> {
        LinUcbAgent::sample(self, chosen_context, reward)
    }
}
