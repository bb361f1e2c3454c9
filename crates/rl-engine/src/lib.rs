//! Contextual bandit policies: linear UCB with a Bayesian linear-Gaussian
//! posterior, and logistic Thompson sampling with a Laplace-approximated
//! posterior refit by Newton-Raphson.

pub mod counter;
pub mod linucb;
pub mod logistic_ts;
pub mod policy;

pub use counter::IterationCounter;
pub use linucb::LinUcbAgent;
pub use logistic_ts::{LogisticTsAgent, RefitReport};
pub use policy::ContextualPolicy;
