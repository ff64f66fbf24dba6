// ============================================================
// Layer 5 — Step Policies
// ============================================================
// Turns the decoder's per-position action distributions
// [batch, steps, K] into full tagging sequences.
//
//   select_action      sample every position from its categorical,
//                      keep the log-probabilities (training)
//   select_max_action  arg-max every position (evaluation)
//
// Both sample / pick over the full padded width first, then
// overwrite positions at or beyond each example's length with
// SENTINEL (and a zero log-probability). Padded rows must therefore
// still be proper distributions.
//
// The sampled sequence is scored by the structural reward in
// Reward mode; the greedy one in Accuracy mode.

use burn::prelude::*;
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    SeedableRng,
};

use crate::data::batcher::BindingBatch;
use crate::domain::error::BindingError;
use crate::domain::index_space::{IndexSpaceConfig, SENTINEL};
use crate::domain::reward::{RewardEvaluator, RewardMode};
use crate::domain::sql::SqlTarget;

// ─── ProbabilityGrid ──────────────────────────────────────────────────────────
/// Host copy of a `[batch, steps, classes]` probability tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityGrid {
    batch:   usize,
    steps:   usize,
    classes: usize,
    values:  Vec<f32>,
}

impl ProbabilityGrid {
    pub fn new(values: Vec<f32>, dims: [usize; 3]) -> Result<Self, BindingError> {
        let [batch, steps, classes] = dims;
        if values.len() != batch * steps * classes {
            return Err(BindingError::ShapeMismatch(format!(
                "{} values for dims {dims:?}",
                values.len()
            )));
        }
        Ok(Self { batch, steps, classes, values })
    }

    pub fn from_tensor<B: Backend>(probs: Tensor<B, 3>) -> Result<Self, BindingError> {
        let dims = probs.dims();
        let values = probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| BindingError::ShapeMismatch(format!("{e:?}")))?;
        Self::new(values, dims)
    }

    /// Stack per-example `[position][class]` rows into one grid of
    /// `steps` positions. Every example must cover its own length;
    /// only positions at or beyond it may be missing, and those get a
    /// uniform row.
    pub fn from_rows(
        rows:    &[Vec<Vec<f32>>],
        lengths: &[usize],
        steps:   usize,
        classes: usize,
    ) -> Result<Self, BindingError> {
        if lengths.len() != rows.len() {
            return Err(BindingError::ShapeMismatch(format!(
                "{} prediction rows for {} lengths",
                rows.len(),
                lengths.len()
            )));
        }
        let uniform = 1.0 / classes.max(1) as f32;
        let mut values = Vec::with_capacity(rows.len() * steps * classes);

        for (b, (example, &length)) in rows.iter().zip(lengths).enumerate() {
            if example.len() > steps {
                return Err(BindingError::ShapeMismatch(format!(
                    "example {b} has {} positions, at most {steps} allowed",
                    example.len()
                )));
            }
            if example.len() < length.min(steps) {
                return Err(BindingError::ShapeMismatch(format!(
                    "example {b} has {} positions but length {length}",
                    example.len()
                )));
            }
            for (t, row) in example.iter().enumerate() {
                if row.len() != classes {
                    return Err(BindingError::ConfigMismatch(format!(
                        "example {b} position {t} has {} classes, expected {classes}",
                        row.len()
                    )));
                }
                values.extend_from_slice(row);
            }
            let missing = (steps - example.len()) * classes;
            values.extend(std::iter::repeat(uniform).take(missing));
        }
        Self::new(values, [rows.len(), steps, classes])
    }

    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 3> {
        Tensor::<B, 1>::from_floats(self.values.as_slice(), device)
            .reshape([self.batch, self.steps, self.classes])
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.batch, self.steps, self.classes]
    }

    pub fn row(&self, b: usize, t: usize) -> &[f32] {
        let start = (b * self.steps + t) * self.classes;
        &self.values[start..start + self.classes]
    }
}

// ─── Outputs ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct SampledActions {
    /// `[batch][steps]`, SENTINEL beyond each length
    pub actions:   Vec<Vec<i64>>,
    /// Sum of log-probabilities over valid positions
    pub log_probs: Vec<f32>,
    /// +1 / -1 structural reward
    pub rewards:   Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GreedyActions {
    pub actions:  Vec<Vec<i64>>,
    /// 1 / 0 structural match
    pub accuracy: Vec<f32>,
}

// ─── Masking ──────────────────────────────────────────────────────────────────
/// Overwrite every position at or beyond `lengths[b]` with SENTINEL and,
/// when given, zero its log-probability. Applying it twice changes nothing.
pub fn mask_after_length(
    actions:   &mut [Vec<i64>],
    log_probs: Option<&mut [Vec<f32>]>,
    lengths:   &[usize],
) {
    for (row, &len) in actions.iter_mut().zip(lengths) {
        for a in row.iter_mut().skip(len) {
            *a = SENTINEL;
        }
    }
    if let Some(log_probs) = log_probs {
        for (row, &len) in log_probs.iter_mut().zip(lengths) {
            for lp in row.iter_mut().skip(len) {
                *lp = 0.0;
            }
        }
    }
}

/// Sum of a row that is safe to sample from.
fn checked_mass(row: &[f32], batch: usize, position: usize) -> Result<f32, BindingError> {
    let reason = if row.iter().any(|p| !p.is_finite()) {
        Some("non-finite probability")
    } else if row.iter().any(|&p| p < 0.0) {
        Some("negative probability")
    } else {
        None
    };
    let mass: f32 = row.iter().sum();
    match reason {
        Some(reason) => Err(BindingError::Distribution { batch, position, reason: reason.into() }),
        None if mass <= 0.0 => Err(BindingError::Distribution {
            batch,
            position,
            reason: "probabilities sum to zero".into(),
        }),
        None => Ok(mass),
    }
}

/// First index holding the largest probability.
fn argmax(row: &[f32]) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(bi, bp), (i, &p)| if p > bp { (i, p) } else { (bi, bp) })
        .0
}

// ─── Policy ───────────────────────────────────────────────────────────────────
/// Owns the only mutable state in the core: the sampling RNG.
/// Same seed + same probabilities ⇒ same actions, log-probs and rewards.
pub struct Policy {
    evaluator: RewardEvaluator,
    rng:       StdRng,
}

impl Policy {
    pub fn new(index_space: IndexSpaceConfig, seed: u64) -> Self {
        Self {
            evaluator: RewardEvaluator::new(index_space),
            rng:       StdRng::seed_from_u64(seed),
        }
    }

    pub fn index_space(&self) -> &IndexSpaceConfig {
        self.evaluator.index_space()
    }

    fn check_inputs(
        &self,
        probs:   &ProbabilityGrid,
        lengths: &[usize],
        targets: &[SqlTarget],
    ) -> Result<(), BindingError> {
        let [batch, steps, classes] = probs.dims();
        self.index_space().ensure_action_space(classes)?;
        if lengths.len() != batch || targets.len() != batch {
            return Err(BindingError::ShapeMismatch(format!(
                "batch of {batch} with {} lengths and {} targets",
                lengths.len(),
                targets.len()
            )));
        }
        if let Some(len) = lengths.iter().find(|&&l| l > steps) {
            return Err(BindingError::ShapeMismatch(format!(
                "length {len} exceeds {steps} positions"
            )));
        }
        Ok(())
    }

    /// Sample one action per position, mask, and score in Reward mode.
    pub fn select_action(
        &mut self,
        probs:   &ProbabilityGrid,
        lengths: &[usize],
        targets: &[SqlTarget],
    ) -> Result<SampledActions, BindingError> {
        self.check_inputs(probs, lengths, targets)?;
        let [batch, steps, _] = probs.dims();

        let mut actions   = vec![vec![0i64; steps]; batch];
        let mut log_probs = vec![vec![0f32; steps]; batch];

        for t in 0..steps {
            for b in 0..batch {
                let row  = probs.row(b, t);
                let mass = checked_mass(row, b, t)?;
                let dist = WeightedIndex::new(row).map_err(|e| BindingError::Distribution {
                    batch:    b,
                    position: t,
                    reason:   e.to_string(),
                })?;
                let a = dist.sample(&mut self.rng);
                actions[b][t]   = a as i64;
                log_probs[b][t] = (row[a] / mass).ln();
            }
        }

        mask_after_length(&mut actions, Some(log_probs.as_mut_slice()), lengths);
        let rewards = self.evaluator.score_batch(&actions, targets, RewardMode::Reward)?;
        let log_probs = log_probs.iter().map(|row| row.iter().sum::<f32>()).collect();

        Ok(SampledActions { actions, log_probs, rewards })
    }

    /// `m` independent draws of [`select_action`](Self::select_action).
    /// No baseline or variance reduction is applied across the draws.
    pub fn select_m_actions(
        &mut self,
        probs:   &ProbabilityGrid,
        lengths: &[usize],
        targets: &[SqlTarget],
        m:       usize,
    ) -> Result<Vec<SampledActions>, BindingError> {
        (0..m.max(1))
            .map(|_| self.select_action(probs, lengths, targets))
            .collect()
    }

    /// Arg-max every position, mask, and score in Accuracy mode.
    pub fn select_max_action(
        &self,
        probs:   &ProbabilityGrid,
        lengths: &[usize],
        targets: &[SqlTarget],
    ) -> Result<GreedyActions, BindingError> {
        self.check_inputs(probs, lengths, targets)?;
        let [batch, steps, _] = probs.dims();

        let mut actions = vec![vec![0i64; steps]; batch];
        for (b, row_actions) in actions.iter_mut().enumerate() {
            for (t, a) in row_actions.iter_mut().enumerate() {
                let row = probs.row(b, t);
                checked_mass(row, b, t)?;
                *a = argmax(row) as i64;
            }
        }

        mask_after_length(&mut actions, None, lengths);
        let accuracy = self.evaluator.score_batch(&actions, targets, RewardMode::Accuracy)?;
        Ok(GreedyActions { actions, accuracy })
    }

    /// Tensor entry point for `m` rollouts: the batch must have been
    /// labelled against this policy's index space.
    pub fn sample_batch<B: Backend>(
        &mut self,
        probs: Tensor<B, 3>,
        batch: &BindingBatch<B>,
        m:     usize,
    ) -> Result<Vec<SampledActions>, BindingError> {
        self.index_space().ensure_matches(&batch.index_space)?;
        let grid = ProbabilityGrid::from_tensor(probs)?;
        self.select_m_actions(&grid, &batch.lengths, &batch.targets, m)
    }

    pub fn greedy_batch<B: Backend>(
        &self,
        probs: Tensor<B, 3>,
        batch: &BindingBatch<B>,
    ) -> Result<GreedyActions, BindingError> {
        self.index_space().ensure_matches(&batch.index_space)?;
        let grid = ProbabilityGrid::from_tensor(probs)?;
        self.select_max_action(&grid, &batch.lengths, &batch.targets)
    }
}
