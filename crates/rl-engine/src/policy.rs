//! Capability shared by every contextual policy, plus the input checks and
//! arm-ranking helper the policies have in common.

use bandit_core::{BanditError, BanditResult};
use nalgebra::{DMatrix, DVector};

/// A contextual bandit policy: picks an arm from a per-arm context matrix
/// (one row per arm) and learns from the reward of the arm it picked.
pub trait ContextualPolicy {
    /// Short label used in logs and reports.
    fn name(&self) -> &'static str;

    fn n_features(&self) -> usize;

    fn iteration(&self) -> u64;

    fn set_iteration(&mut self, t: u64) -> BanditResult<()>;

    /// Choose an arm. Takes `&mut self` because sampling policies advance
    /// their random state.
    fn select_arm(&mut self, contexts: &DMatrix<f64>) -> BanditResult<usize>;

    /// Record the reward observed for the chosen arm's context and advance
    /// the round counter.
    fn sample(&mut self, chosen_context: &DVector<f64>, reward: f64) -> BanditResult<()>;
}

/// Index of the largest score; the first occurrence wins ties.
///
/// NaN scores never win; `+inf` beats every finite score. Fails when every
/// score is NaN.
pub fn argmax_first(scores: &DVector<f64>) -> BanditResult<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }
    best.map(|(i, _)| i).ok_or_else(|| {
        BanditError::NumericDegeneracy(format!(
            "no comparable score among {} arms",
            scores.len()
        ))
    })
}

pub(crate) fn check_vector(what: &str, v: &DVector<f64>, n_features: usize) -> BanditResult<()> {
    if v.len() != n_features {
        return Err(BanditError::dimension_mismatch(what, n_features, v.len()));
    }
    if v.iter().any(|x| !x.is_finite()) {
        return Err(BanditError::InvalidArgument(format!(
            "{what} contains non-finite values"
        )));
    }
    // Outer products of the vector feed both posteriors.
    if !v.norm_squared().is_finite() {
        return Err(BanditError::InvalidArgument(format!(
            "{what} is too large: squared norm overflows"
        )));
    }
    Ok(())
}

pub(crate) fn check_contexts(
    contexts: &DMatrix<f64>,
    n_arms: Option<usize>,
    n_features: usize,
) -> BanditResult<()> {
    if contexts.ncols() != n_features {
        return Err(BanditError::dimension_mismatch(
            "context matrix columns",
            n_features,
            contexts.ncols(),
        ));
    }
    match n_arms {
        Some(n_arms) if contexts.nrows() != n_arms => {
            return Err(BanditError::dimension_mismatch(
                "context matrix rows",
                n_arms,
                contexts.nrows(),
            ));
        }
        None if contexts.nrows() == 0 => {
            return Err(BanditError::InvalidArgument(
                "context matrix has no arms".to_string(),
            ));
        }
        _ => {}
    }
    if contexts.iter().any(|x| !x.is_finite()) {
        return Err(BanditError::InvalidArgument(
            "context matrix contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_reward(reward: f64) -> BanditResult<()> {
    if reward.is_finite() {
        Ok(())
    } else {
        Err(BanditError::InvalidArgument(format!(
            "reward must be finite, got {reward}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_occurrence_wins() {
        let scores = DVector::from_vec(vec![0.5, 2.0, 2.0, -1.0]);
        assert_eq!(argmax_first(&scores).unwrap(), 1);
    }

    #[test]
    fn test_argmax_skips_nan() {
        let scores = DVector::from_vec(vec![f64::NAN, -3.0, f64::NAN]);
        assert_eq!(argmax_first(&scores).unwrap(), 1);

        let scores = DVector::from_vec(vec![0.0107, f64::INFINITY, f64::INFINITY]);
        assert_eq!(argmax_first(&scores).unwrap(), 1);

        let scores = DVector::from_vec(vec![f64::NEG_INFINITY, f64::NAN]);
        assert_eq!(argmax_first(&scores).unwrap(), 0);

        let scores = DVector::from_vec(vec![f64::NAN, f64::NAN]);
        assert!(matches!(
            argmax_first(&scores),
            Err(BanditError::NumericDegeneracy(_))
        ));
    }

    #[test]
    fn test_check_contexts_shapes() {
        let contexts = DMatrix::from_row_slice(3, 2, &[1.0, 2.0, 4.0, 5.0, 7.0, 8.0]);
        assert!(check_contexts(&contexts, Some(3), 2).is_ok());
        assert!(check_contexts(&contexts, None, 2).is_ok());
        assert!(check_contexts(&contexts, Some(2), 2).is_err());
        assert!(check_contexts(&contexts, None, 3).is_err());

        let empty = DMatrix::<f64>::zeros(0, 2);
        assert!(check_contexts(&empty, None, 2).is_err());
    }

    #[test]
    fn test_check_vector_and_reward() {
        let context = DVector::from_vec(vec![1.0, f64::INFINITY]);
        assert!(check_vector("chosen context", &context, 2).is_err());
        assert!(check_vector("theta", &DVector::from_vec(vec![1.0]), 2).is_err());
        let huge = DVector::from_vec(vec![1e200, 1e200]);
        assert!(matches!(
            check_vector("chosen context", &huge, 2),
            Err(BanditError::InvalidArgument(_))
        ));
        assert!(check_vector("chosen context", &DVector::from_vec(vec![1e100, -1e100]), 2).is_ok());
        assert!(check_reward(f64::NAN).is_err());
        assert!(check_reward(0.4).is_ok());
    }
}
