//! Synthetic reward environment with a hidden true parameter, so the
//! expected reward of every arm (and therefore regret) is known.

use bandit_core::{BanditError, BanditResult};
use bandit_rl_engine::logistic_ts::logistic_link;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, StandardNormal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RewardModel {
    /// `r = c . theta* + N(0, noise_std^2)`
    Linear { noise_std: f64 },
    /// `P(r = 1) = logistic(c . theta*)`
    Bernoulli,
}

pub struct Environment {
    theta_star: DVector<f64>,
    n_arms: usize,
    reward_model: RewardModel,
    /// Observation noise for the linear model.
    noise: Option<Normal<f64>>,
    rng: StdRng,
}

impl Environment {
    pub fn new(
        n_arms: usize,
        n_features: usize,
        reward_model: RewardModel,
        seed: u64,
    ) -> BanditResult<Self> {
        let noise = match reward_model {
            RewardModel::Linear { noise_std } if noise_std.is_finite() && noise_std > 0.0 => {
                Some(Normal::new(0.0, noise_std).map_err(|e| {
                    BanditError::InvalidArgument(format!("noise_std {noise_std}: {e}"))
                })?)
            }
            RewardModel::Linear { noise_std } => {
                return Err(BanditError::InvalidArgument(format!(
                    "noise_std must be positive and finite, got {noise_std}"
                )));
            }
            RewardModel::Bernoulli => None,
        };

        let mut rng = StdRng::seed_from_u64(seed);
        let scale = (n_features as f64).sqrt().recip();
        let theta_star = DVector::from_fn(n_features, |_, _| {
            let z: f64 = StandardNormal.sample(&mut rng);
            z * scale
        });

        Ok(Self {
            theta_star,
            n_arms,
            reward_model,
            noise,
            rng,
        })
    }

    pub fn theta_star(&self) -> &DVector<f64> {
        &self.theta_star
    }

    /// Draw this round's context matrix, one row per arm.
    pub fn contexts(&mut self) -> DMatrix<f64> {
        let d = self.theta_star.len();
        let scale = (d as f64).sqrt().recip();
        let rng = &mut self.rng;
        DMatrix::from_fn(self.n_arms, d, |_, _| {
            let z: f64 = StandardNormal.sample(rng);
            z * scale
        })
    }

    pub fn expected_rewards(&self, contexts: &DMatrix<f64>) -> DVector<f64> {
        let linear = contexts * &self.theta_star;
        match self.reward_model {
            RewardModel::Linear { .. } => linear,
            RewardModel::Bernoulli => linear.map(logistic_link),
        }
    }

    /// Play `arm` and draw its reward.
    pub fn pull(&mut self, contexts: &DMatrix<f64>, arm: usize) -> f64 {
        let mean = self.expected_rewards(contexts)[arm];
        match &self.noise {
            Some(noise) => mean + noise.sample(&mut self.rng),
            None => {
                if self.rng.gen::<f64>() < mean {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Expected reward lost by playing `arm` instead of the best arm.
    pub fn regret(&self, contexts: &DMatrix<f64>, arm: usize) -> f64 {
        let expected = self.expected_rewards(contexts);
        expected.max() - expected[arm]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_noise_rejected() {
        for noise_std in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                Environment::new(2, 2, RewardModel::Linear { noise_std }, 0),
                Err(BanditError::InvalidArgument(_))
            ));
        }
        assert!(Environment::new(2, 2, RewardModel::Linear { noise_std: 0.1 }, 0).is_ok());
    }

    #[test]
    fn test_same_seed_same_environment() {
        let mut a = Environment::new(3, 4, RewardModel::Bernoulli, 5).unwrap();
        let mut b = Environment::new(3, 4, RewardModel::Bernoulli, 5).unwrap();
        assert_eq!(a.theta_star(), b.theta_star());
        assert_eq!(a.contexts(), b.contexts());
    }

    #[test]
    fn test_regret_is_zero_only_for_best_arm() {
        let mut env = Environment::new(4, 3, RewardModel::Linear { noise_std: 0.1 }, 1).unwrap();
        let contexts = env.contexts();
        let expected = env.expected_rewards(&contexts);
        let best = expected.argmax().0;

        assert_eq!(env.regret(&contexts, best), 0.0);
        for arm in 0..4 {
            assert!(env.regret(&contexts, arm) >= 0.0);
        }
    }

    #[test]
    fn test_bernoulli_rewards_are_binary() {
        let mut env = Environment::new(2, 2, RewardModel::Bernoulli, 8).unwrap();
        for _ in 0..50 {
            let contexts = env.contexts();
            let p = env.expected_rewards(&contexts);
            assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
            let r = env.pull(&contexts, 0);
            assert!(r == 0.0 || r == 1.0);
        }
    }

    #[test]
    fn test_linear_rewards_center_on_mean() {
        let mut env = Environment::new(1, 2, RewardModel::Linear { noise_std: 0.5 }, 2).unwrap();
        let contexts = env.contexts();
        let mean = env.expected_rewards(&contexts)[0];
        let n = 2000;
        let avg = (0..n).map(|_| env.pull(&contexts, 0)).sum::<f64>() / n as f64;
        assert!((avg - mean).abs() < 0.05);
    }
}
