//! Masked ε-greedy action selection.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rlfuzz_contracts::error::{FuzzError, FuzzResult};

use crate::traits::ValueFunction;

/// With probability ε a uniformly random legal action, otherwise the legal
/// action with the highest estimate (ties → lowest index).
///
/// Owns its own random stream so exploration is reproducible from the seed
/// independently of weight init and payload randomness.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
    rng: ChaCha8Rng,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64, seed: u64) -> FuzzResult<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(FuzzError::InvalidArgument {
                reason: format!("epsilon {epsilon} outside [0, 1]"),
            });
        }
        Ok(Self {
            epsilon,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn select(
        &mut self,
        value: &dyn ValueFunction,
        features: &[f64],
        mask: &[bool],
    ) -> FuzzResult<usize> {
        if mask.len() != value.action_count() {
            return Err(FuzzError::DimensionMismatch {
                expected: value.action_count(),
                actual: mask.len(),
            });
        }
        let legal: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(a, ok)| ok.then_some(a))
            .collect();
        if legal.is_empty() {
            return Err(FuzzError::NoLegalActions);
        }

        if self.epsilon > 0.0 && self.rng.gen::<f64>() < self.epsilon {
            return Ok(legal[self.rng.gen_range(0..legal.len())]);
        }

        let estimates = value.estimate_all(features)?;
        let mut best = legal[0];
        for &a in &legal[1..] {
            if estimates[a] > estimates[best] {
                best = a;
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed estimates regardless of state.
    struct TableValue(Vec<f64>);

    impl ValueFunction for TableValue {
        fn input_dim(&self) -> usize {
            1
        }
        fn action_count(&self) -> usize {
            self.0.len()
        }
        fn estimate(&self, _state: &[f64], action: usize) -> FuzzResult<f64> {
            Ok(self.0[action])
        }
        fn estimate_all(&self, _state: &[f64]) -> FuzzResult<Vec<f64>> {
            Ok(self.0.clone())
        }
        fn update(&mut self, _: &[f64], _: usize, _: f64, _: f64) -> FuzzResult<()> {
            Ok(())
        }
    }

    #[test]
    fn greedy_picks_best_legal_action() {
        let value = TableValue(vec![1.0, 9.0, 3.0, 5.0]);
        let mut policy = EpsilonGreedy::new(0.0, 1).unwrap();

        assert_eq!(policy.select(&value, &[0.0], &[true; 4]).unwrap(), 1);
        // Best action masked out → next best legal one.
        assert_eq!(
            policy.select(&value, &[0.0], &[true, false, true, true]).unwrap(),
            3
        );
    }

    #[test]
    fn greedy_breaks_ties_by_lowest_index() {
        let value = TableValue(vec![0.0, 2.0, 2.0, 2.0]);
        let mut policy = EpsilonGreedy::new(0.0, 1).unwrap();
        assert_eq!(
            policy.select(&value, &[0.0], &[false, false, true, true]).unwrap(),
            2
        );
    }

    #[test]
    fn all_false_mask_is_an_error() {
        let value = TableValue(vec![0.0; 3]);
        let mut policy = EpsilonGreedy::new(0.5, 1).unwrap();
        assert!(matches!(
            policy.select(&value, &[0.0], &[false; 3]),
            Err(FuzzError::NoLegalActions)
        ));
    }

    #[test]
    fn mask_length_must_match_action_count() {
        let value = TableValue(vec![0.0; 3]);
        let mut policy = EpsilonGreedy::new(0.0, 1).unwrap();
        assert!(matches!(
            policy.select(&value, &[0.0], &[true; 2]),
            Err(FuzzError::DimensionMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn rejects_epsilon_outside_unit_interval() {
        assert!(EpsilonGreedy::new(-0.1, 0).is_err());
        assert!(EpsilonGreedy::new(1.1, 0).is_err());
    }

    #[test]
    fn full_exploration_is_uniform_over_legal_actions() {
        let value = TableValue(vec![100.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mask = [false, true, true, false, true, true];
        let mut policy = EpsilonGreedy::new(1.0, 42).unwrap();

        let trials = 40_000;
        let mut counts = [0usize; 6];
        for _ in 0..trials {
            counts[policy.select(&value, &[0.0], &mask).unwrap()] += 1;
        }

        assert_eq!(counts[0], 0);
        assert_eq!(counts[3], 0);
        let expected = trials as f64 / 4.0;
        for a in [1, 2, 4, 5] {
            let deviation = (counts[a] as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "action {a}: {} vs {expected}", counts[a]);
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let value = TableValue(vec![0.0; 5]);
        let mut a = EpsilonGreedy::new(0.7, 9).unwrap();
        let mut b = EpsilonGreedy::new(0.7, 9).unwrap();
        for _ in 0..100 {
            assert_eq!(
                a.select(&value, &[0.0], &[true; 5]).unwrap(),
                b.select(&value, &[0.0], &[true; 5]).unwrap()
            );
        }
    }
}
