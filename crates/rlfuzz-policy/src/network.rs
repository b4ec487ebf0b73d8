//! A small action-value network with a hand-written gradient.
//!
//! Architecture:
//!
//!   input[D] → tanh hidden[H] → Q[A] (linear, one head per action)
//!
//! Only the head of the taken action and the shared trunk move on an update.
//! Weights live in flat row-major buffers: `w_hidden[h * D + d]` and
//! `w_head[a * H + h]`.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use rlfuzz_contracts::{
    action::ACTION_COUNT,
    config::TrainingConfig,
    error::{FuzzError, FuzzResult},
    observation::FEATURE_COUNT,
};
use rlfuzz_core::traits::ValueFunction;

/// Default TD-error clip, matching `TrainingConfig::default().error_clip`.
pub const DEFAULT_ERROR_CLIP: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct QNetwork {
    input_dim: usize,
    hidden_units: usize,
    action_count: usize,
    w_hidden: Vec<f64>,
    b_hidden: Vec<f64>,
    w_head: Vec<f64>,
    b_head: Vec<f64>,
    error_clip: f64,
}

impl QNetwork {
    /// Build a network with uniform Xavier weights and zero biases.
    ///
    /// Returns `FuzzError::InvalidArgument` if any dimension is zero.
    pub fn new(
        input_dim: usize,
        hidden_units: usize,
        action_count: usize,
        seed: u64,
    ) -> FuzzResult<Self> {
        if input_dim == 0 || hidden_units == 0 || action_count == 0 {
            return Err(FuzzError::InvalidArgument {
                reason: format!(
                    "network dimensions must be > 0, got {input_dim}x{hidden_units}x{action_count}"
                ),
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let trunk_limit = (6.0 / (input_dim + hidden_units) as f64).sqrt();
        let head_limit = (6.0 / (hidden_units + action_count) as f64).sqrt();

        let w_hidden = (0..hidden_units * input_dim)
            .map(|_| rng.gen_range(-trunk_limit..trunk_limit))
            .collect();
        let w_head = (0..action_count * hidden_units)
            .map(|_| rng.gen_range(-head_limit..head_limit))
            .collect();

        debug!(input_dim, hidden_units, action_count, seed, "value network initialized");

        Ok(Self {
            input_dim,
            hidden_units,
            action_count,
            w_hidden,
            b_hidden: vec![0.0; hidden_units],
            w_head,
            b_head: vec![0.0; action_count],
            error_clip: DEFAULT_ERROR_CLIP,
        })
    }

    /// Sized for the current feature and action schemas, seeded and clipped
    /// from `config`.
    pub fn from_config(config: &TrainingConfig) -> FuzzResult<Self> {
        Self::new(FEATURE_COUNT, config.hidden_units, ACTION_COUNT, config.init_seed())?
            .with_error_clip(config.error_clip)
    }

    /// Returns `FuzzError::InvalidArgument` unless `error_clip` is positive.
    pub fn with_error_clip(mut self, error_clip: f64) -> FuzzResult<Self> {
        if error_clip.is_nan() || error_clip <= 0.0 {
            return Err(FuzzError::InvalidArgument {
                reason: format!("error_clip {} must be positive", error_clip),
            });
        }
        self.error_clip = error_clip;
        Ok(self)
    }

    pub fn hidden_units(&self) -> usize {
        self.hidden_units
    }

    /// Every parameter, trunk first. Used to compare networks in tests and
    /// to fingerprint a run.
    pub fn parameters(&self) -> Vec<f64> {
        let mut all = Vec::with_capacity(
            self.w_hidden.len() + self.b_hidden.len() + self.w_head.len() + self.b_head.len(),
        );
        all.extend_from_slice(&self.w_hidden);
        all.extend_from_slice(&self.b_hidden);
        all.extend_from_slice(&self.w_head);
        all.extend_from_slice(&self.b_head);
        all
    }

    fn check_state(&self, state: &[f64]) -> FuzzResult<()> {
        if state.len() != self.input_dim {
            return Err(FuzzError::DimensionMismatch {
                expected: self.input_dim,
                actual: state.len(),
            });
        }
        Ok(())
    }

    fn check_action(&self, action: usize) -> FuzzResult<()> {
        if action >= self.action_count {
            return Err(FuzzError::ActionOutOfRange {
                index: action,
                count: self.action_count,
            });
        }
        Ok(())
    }

    fn hidden(&self, state: &[f64]) -> Vec<f64> {
        self.w_hidden
            .chunks_exact(self.input_dim)
            .zip(&self.b_hidden)
            .map(|(row, b)| {
                let z: f64 = row.iter().zip(state).map(|(w, x)| w * x).sum::<f64>() + b;
                z.tanh()
            })
            .collect()
    }

    fn head(&self, hidden: &[f64], action: usize) -> f64 {
        let row = &self.w_head[action * self.hidden_units..(action + 1) * self.hidden_units];
        row.iter().zip(hidden).map(|(w, h)| w * h).sum::<f64>() + self.b_head[action]
    }
}

impl ValueFunction for QNetwork {
    fn input_dim(&self) -> usize {
        self.input_dim
    }

    fn action_count(&self) -> usize {
        self.action_count
    }

    fn estimate(&self, state: &[f64], action: usize) -> FuzzResult<f64> {
        self.check_state(state)?;
        self.check_action(action)?;
        let hidden = self.hidden(state);
        Ok(self.head(&hidden, action))
    }

    fn estimate_all(&self, state: &[f64]) -> FuzzResult<Vec<f64>> {
        self.check_state(state)?;
        let hidden = self.hidden(state);
        Ok((0..self.action_count)
            .map(|a| self.head(&hidden, a))
            .collect())
    }

    /// Semi-gradient step: `θ += α · clip(error) · ∇θ Q(state, action)`.
    ///
    /// The trunk gradient is taken through the head weights as they were
    /// before this update.
    fn update(
        &mut self,
        state: &[f64],
        action: usize,
        error: f64,
        learning_rate: f64,
    ) -> FuzzResult<()> {
        self.check_state(state)?;
        self.check_action(action)?;
        if !error.is_finite() {
            return Err(FuzzError::InvalidArgument {
                reason: format!("non-finite TD error {error}"),
            });
        }

        let step = learning_rate * error.clamp(-self.error_clip, self.error_clip);
        if step == 0.0 {
            return Ok(());
        }

        let hidden = self.hidden(state);
        let h_units = self.hidden_units;
        let head_row = action * h_units..(action + 1) * h_units;
        let old_head: Vec<f64> = self.w_head[head_row.clone()].to_vec();

        for (w, h) in self.w_head[head_row].iter_mut().zip(&hidden) {
            *w += step * h;
        }
        self.b_head[action] += step;

        for (h, (out, w_out)) in hidden.iter().zip(&old_head).enumerate() {
            let chain = step * w_out * (1.0 - out * out);
            let row = &mut self.w_hidden[h * self.input_dim..(h + 1) * self.input_dim];
            for (w, x) in row.iter_mut().zip(state) {
                *w += chain * x;
            }
            self.b_hidden[h] += chain;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..FEATURE_COUNT).map(|_| rng.gen::<f64>()).collect()
    }

    fn net() -> QNetwork {
        QNetwork::new(FEATURE_COUNT, 8, ACTION_COUNT, 1234).unwrap()
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn zero_dimension_is_rejected() {
        for (d, h, a) in [(0, 8, 4), (4, 0, 4), (4, 8, 0)] {
            assert!(matches!(
                QNetwork::new(d, h, a, 0),
                Err(FuzzError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn weights_respect_xavier_limits_and_biases_start_at_zero() {
        let n = net();
        let trunk_limit = (6.0 / (FEATURE_COUNT + 8) as f64).sqrt();
        let head_limit = (6.0 / (8 + ACTION_COUNT) as f64).sqrt();
        assert!(n.w_hidden.iter().all(|w| w.abs() <= trunk_limit));
        assert!(n.w_head.iter().all(|w| w.abs() <= head_limit));
        assert!(n.b_hidden.iter().all(|b| *b == 0.0));
        assert!(n.b_head.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn same_seed_same_weights() {
        assert_eq!(net().parameters(), net().parameters());
        let other = QNetwork::new(FEATURE_COUNT, 8, ACTION_COUNT, 99).unwrap();
        assert_ne!(net().parameters(), other.parameters());
    }

    #[test]
    fn from_config_uses_schema_dimensions() {
        let n = QNetwork::from_config(&TrainingConfig::default()).unwrap();
        assert_eq!(n.input_dim(), FEATURE_COUNT);
        assert_eq!(n.action_count(), ACTION_COUNT);
        assert_eq!(n.hidden_units(), 8);
    }

    // ── Forward pass ─────────────────────────────────────────────────────────

    #[test]
    fn estimate_all_matches_estimate() {
        let n = net();
        for seed in 0..5 {
            let s = state(seed);
            let all = n.estimate_all(&s).unwrap();
            assert_eq!(all.len(), ACTION_COUNT);
            for (a, q) in all.iter().enumerate() {
                assert_eq!(*q, n.estimate(&s, a).unwrap());
            }
        }
    }

    #[test]
    fn wrong_state_length_is_rejected() {
        let n = net();
        assert!(matches!(
            n.estimate(&[0.0; 3], 0),
            Err(FuzzError::DimensionMismatch { expected: FEATURE_COUNT, actual: 3 })
        ));
        assert!(n.estimate_all(&[0.0; FEATURE_COUNT + 1]).is_err());
    }

    #[test]
    fn out_of_range_action_is_rejected() {
        let n = net();
        assert!(matches!(
            n.estimate(&state(0), ACTION_COUNT),
            Err(FuzzError::ActionOutOfRange { .. })
        ));
        let mut n = n;
        assert!(n.update(&state(0), ACTION_COUNT, 1.0, 0.1).is_err());
    }

    #[test]
    fn best_action_is_argmax() {
        let n = net();
        let s = state(3);
        let all = n.estimate_all(&s).unwrap();
        let best = n.best_action(&s).unwrap();
        assert!(all.iter().all(|q| *q <= all[best]));
    }

    // ── Learning ─────────────────────────────────────────────────────────────

    #[test]
    fn zero_error_leaves_parameters_unchanged() {
        let mut n = net();
        let before = n.parameters();
        n.update(&state(1), 5, 0.0, 0.5).unwrap();
        assert_eq!(n.parameters(), before);
    }

    #[test]
    fn positive_error_raises_the_estimate() {
        let mut n = net();
        let s = state(2);
        for action in [0, 7, ACTION_COUNT - 1] {
            let before = n.estimate(&s, action).unwrap();
            n.update(&s, action, 1.0, 0.01).unwrap();
            let after = n.estimate(&s, action).unwrap();
            assert!(after > before, "action {action}: {before} → {after}");
        }
    }

    #[test]
    fn negative_error_lowers_the_estimate() {
        let mut n = net();
        let s = state(4);
        let before = n.estimate(&s, 3).unwrap();
        n.update(&s, 3, -1.0, 0.01).unwrap();
        assert!(n.estimate(&s, 3).unwrap() < before);
    }

    #[test]
    fn update_only_moves_the_taken_head() {
        let mut n = net();
        let untouched = n.w_head[2 * 8..3 * 8].to_vec();
        n.update(&state(5), 1, 1.0, 0.1).unwrap();
        assert_eq!(&n.w_head[2 * 8..3 * 8], untouched.as_slice());
        assert_eq!(n.b_head[2], 0.0);
        assert_eq!(n.b_head[1], 0.1);
    }

    #[test]
    fn error_is_clipped() {
        let mut huge = net();
        let mut clipped = net();
        let s = state(6);
        huge.update(&s, 0, 1e6, 0.01).unwrap();
        clipped.update(&s, 0, DEFAULT_ERROR_CLIP, 0.01).unwrap();
        assert_eq!(huge.parameters(), clipped.parameters());
    }

    #[test]
    fn custom_clip_bounds_the_step() {
        let mut huge = net().with_error_clip(0.5).unwrap();
        let mut clipped = net();
        let s = state(6);
        huge.update(&s, 0, 1e6, 0.01).unwrap();
        clipped.update(&s, 0, 0.5, 0.01).unwrap();
        assert_eq!(huge.parameters(), clipped.parameters());
    }

    #[test]
    fn non_positive_clip_is_rejected() {
        for clip in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                net().with_error_clip(clip),
                Err(FuzzError::InvalidArgument { .. })
            ));
        }
    }

    #[test]
    fn non_finite_error_is_rejected() {
        let mut n = net();
        assert!(n.update(&state(0), 0, f64::NAN, 0.1).is_err());
    }

    #[test]
    fn repeated_updates_converge_toward_target() {
        let mut n = net();
        let s = state(7);
        let target = 2.0;
        for _ in 0..500 {
            let q = n.estimate(&s, 4).unwrap();
            n.update(&s, 4, target - q, 0.05).unwrap();
        }
        assert!((n.estimate(&s, 4).unwrap() - target).abs() < 1e-3);
    }
}
