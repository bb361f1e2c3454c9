//! Benchmarks for arm selection and posterior updates.
//! Run with: cargo bench

use bandit_core::config::{LinUcbConfig, LogisticTsConfig};
use bandit_rl_engine::{LinUcbAgent, LogisticTsAgent};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N_ARMS: usize = 16;
const N_FEATURES: usize = 32;

fn random_contexts(rng: &mut StdRng) -> DMatrix<f64> {
    DMatrix::from_fn(N_ARMS, N_FEATURES, |_, _| rng.gen_range(-1.0..1.0))
}

fn main() {
    let mut rng = StdRng::seed_from_u64(0);
    let iterations = 10_000;

    let mut linucb = LinUcbAgent::new(&LinUcbConfig::new(N_FEATURES, N_ARMS))
        .expect("Failed to create LinUCB agent");
    linucb.sample(&DVector::zeros(N_FEATURES), 0.0).unwrap();
    linucb.sample(&DVector::zeros(N_FEATURES), 0.0).unwrap();

    let start = std::time::Instant::now();
    for _ in 0..iterations {
        let contexts = random_contexts(&mut rng);
        let arm = linucb.select_arm(&contexts).unwrap();
        let reward = rng.gen::<f64>();
        linucb
            .sample(&contexts.row(arm).transpose(), reward)
            .unwrap();
    }
    let elapsed = start.elapsed();
    println!("=== LinUCB ({N_ARMS} arms, {N_FEATURES} features) ===");
    println!("Rounds:        {}", iterations);
    println!("Total time:    {:?}", elapsed);
    println!("Avg per round: {:?}", elapsed / iterations as u32);

    let mut ts = LogisticTsAgent::new(&LogisticTsConfig {
        seed: Some(0),
        ..LogisticTsConfig::new(N_FEATURES)
    })
    .expect("Failed to create Logistic TS agent");

    let start = std::time::Instant::now();
    for _ in 0..iterations {
        let contexts = random_contexts(&mut rng);
        let arm = ts.select_arm(&contexts).unwrap();
        let reward = if rng.gen::<f64>() < 0.3 { 1.0 } else { 0.0 };
        ts.sample(&contexts.row(arm).transpose(), reward).unwrap();
    }
    let elapsed = start.elapsed();
    println!("=== Logistic TS ({N_ARMS} arms, {N_FEATURES} features) ===");
    println!("Rounds:        {}", iterations);
    println!("Refits:        {}", ts.refit_count());
    println!("Total time:    {:?}", elapsed);
    println!("Avg per round: {:?}", elapsed / iterations as u32);
}
