// ============================================================
// Layer 3 — Structural Reward
// ============================================================
// Scores one action sequence against the target SQL. The action
// sequence is decoded back into
//
//   predicted columns          distinct column ordinals referenced
//   predicted value positions  token positions tagged as a value
//
// and three rules must all hold:
//
//   1. sel_col is among the predicted columns
//   2. predicted columns minus sel_col ⊆ conds_cols
//   3. predicted value positions == target value positions
//      (same positions, same order)
//
// No partial credit: success is 1.0, failure is -1.0 when training
// and 0.0 when measuring accuracy.

use std::collections::BTreeSet;

use crate::domain::error::BindingError;
use crate::domain::index_space::{IndexSpaceConfig, Reference};
use crate::domain::sql::SqlTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardMode {
    /// Policy-gradient signal: +1 / -1.
    Reward,
    /// Evaluation metric: 1 / 0.
    Accuracy,
}

impl RewardMode {
    fn value(self, success: bool) -> f32 {
        match (self, success) {
            (_, true)                    => 1.0,
            (RewardMode::Reward, false)   => -1.0,
            (RewardMode::Accuracy, false) => 0.0,
        }
    }
}

/// Columns and value positions recovered from a flat action sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedActions {
    pub columns:         BTreeSet<usize>,
    pub value_positions: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct RewardEvaluator {
    index_space: IndexSpaceConfig,
}

impl RewardEvaluator {
    pub fn new(index_space: IndexSpaceConfig) -> Self {
        Self { index_space }
    }

    pub fn index_space(&self) -> &IndexSpaceConfig {
        &self.index_space
    }

    /// Sentinel and out-of-space actions decode to nothing.
    pub fn decode(&self, actions: &[i64]) -> DecodedActions {
        let mut decoded = DecodedActions::default();
        for (position, &action) in actions.iter().enumerate() {
            match self.index_space.decode(action) {
                Some(Reference::Column(k)) => {
                    decoded.columns.insert(k);
                }
                Some(Reference::Value(_)) => decoded.value_positions.push(position),
                Some(Reference::None) | None => {}
            }
        }
        decoded
    }

    pub fn is_match(&self, actions: &[i64], target: &SqlTarget) -> Result<bool, BindingError> {
        target.validate(&self.index_space)?;
        let DecodedActions { mut columns, value_positions } = self.decode(actions);

        let sel_col = target.sel_col as usize;
        if !columns.remove(&sel_col) {
            return Ok(false);
        }
        let conds = target.condition_columns();
        if !columns.iter().all(|c| conds.contains(c)) {
            return Ok(false);
        }
        Ok(value_positions == target.value_positions())
    }

    pub fn score(&self, actions: &[i64], target: &SqlTarget, mode: RewardMode) -> Result<f32, BindingError> {
        Ok(mode.value(self.is_match(actions, target)?))
    }

    /// Score every row of a batch; `actions` and `targets` are aligned.
    pub fn score_batch(
        &self,
        actions: &[Vec<i64>],
        targets: &[SqlTarget],
        mode:    RewardMode,
    ) -> Result<Vec<f32>, BindingError> {
        if actions.len() != targets.len() {
            return Err(BindingError::ShapeMismatch(format!(
                "{} action rows for {} targets",
                actions.len(),
                targets.len()
            )));
        }
        actions
            .iter()
            .zip(targets)
            .map(|(row, target)| self.score(row, target, mode))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_space::{LabelVariant, SENTINEL};

    // tokenize_max_len=5, 3 columns, 2 values
    fn gate_evaluator() -> RewardEvaluator {
        let cfg = IndexSpaceConfig::new(LabelVariant::GateRelative { cell_info: true }, 5, 4, 3).unwrap();
        RewardEvaluator::new(cfg)
    }

    fn target() -> SqlTarget {
        SqlTarget::new(1, vec![2], vec![[3, 4]])
    }

    // gate layout: 0 none, 1..=3 columns, 4..=5 values
    const NONE: i64 = 0;
    const COL1: i64 = 2;
    const COL2: i64 = 3;
    const VAL0: i64 = 4;

    #[test]
    fn test_full_match_rewards_one() {
        let ev = gate_evaluator();
        let actions = [COL1, NONE, COL2, VAL0, NONE];
        assert_eq!(ev.score(&actions, &target(), RewardMode::Reward).unwrap(), 1.0);
        assert_eq!(ev.score(&actions, &target(), RewardMode::Accuracy).unwrap(), 1.0);
    }

    #[test]
    fn test_wrong_value_position_fails() {
        let ev = gate_evaluator();
        let actions = [COL1, NONE, VAL0, NONE, COL2];
        assert_eq!(ev.score(&actions, &target(), RewardMode::Reward).unwrap(), -1.0);
        assert_eq!(ev.score(&actions, &target(), RewardMode::Accuracy).unwrap(), 0.0);
    }

    #[test]
    fn test_extra_value_position_gets_no_partial_credit() {
        let ev = gate_evaluator();
        let actions = [COL1, NONE, COL2, VAL0, VAL0];
        assert_eq!(ev.score(&actions, &target(), RewardMode::Reward).unwrap(), -1.0);
    }

    #[test]
    fn test_missing_selected_column_fails() {
        let ev = gate_evaluator();
        let actions = [NONE, NONE, COL2, VAL0, NONE];
        assert_eq!(ev.score(&actions, &target(), RewardMode::Accuracy).unwrap(), 0.0);
    }

    #[test]
    fn test_column_outside_conditions_fails() {
        let ev = gate_evaluator();
        // column 0 is neither selected nor a condition column
        let actions = [COL1, 1, COL2, VAL0, NONE];
        assert_eq!(ev.score(&actions, &target(), RewardMode::Reward).unwrap(), -1.0);
    }

    #[test]
    fn test_sentinel_conditions_and_no_values() {
        let ev = gate_evaluator();
        let t = SqlTarget::new(0, vec![SENTINEL, SENTINEL], vec![[SENTINEL, SENTINEL]; 2]);
        let actions = [1, NONE, NONE, SENTINEL, SENTINEL];
        assert_eq!(ev.score(&actions, &t, RewardMode::Reward).unwrap(), 1.0);
    }

    #[test]
    fn test_empty_sequence_is_scored_not_rejected() {
        let ev = gate_evaluator();
        let t = SqlTarget::new(0, vec![SENTINEL], vec![[SENTINEL, SENTINEL]]);
        // nothing predicted, so rule 1 cannot hold
        assert_eq!(ev.score(&[], &t, RewardMode::Reward).unwrap(), -1.0);
    }

    #[test]
    fn test_value_order_matters() {
        let ev = gate_evaluator();
        let t = SqlTarget::new(0, vec![1, 2], vec![[3, 4], [1, 2]]);
        let actions = [1, VAL0, NONE, VAL0, NONE];
        // predicted [1, 3] vs target [3, 1]
        assert_eq!(ev.score(&actions, &t, RewardMode::Accuracy).unwrap(), 0.0);
    }

    #[test]
    fn test_baseline_decoding() {
        let cfg = IndexSpaceConfig::new(LabelVariant::BaselineAbsolute, 5, 4, 3).unwrap();
        let ev = RewardEvaluator::new(cfg);
        // positions are their own "none"; columns start at 5, values at 8
        let actions = [6, 1, 7, 8, 4];
        let decoded = ev.decode(&actions);
        assert_eq!(decoded.columns, BTreeSet::from([1, 2]));
        assert_eq!(decoded.value_positions, vec![3]);
        assert_eq!(ev.score(&actions, &target(), RewardMode::Reward).unwrap(), 1.0);
    }

    #[test]
    fn test_malformed_target_is_reported() {
        let ev = gate_evaluator();
        let t = SqlTarget::new(7, vec![], vec![]);
        assert!(matches!(
            ev.score(&[COL1], &t, RewardMode::Reward),
            Err(BindingError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_score_batch_shape_check() {
        let ev = gate_evaluator();
        let err = ev
            .score_batch(&[vec![COL1]], &[target(), target()], RewardMode::Reward)
            .unwrap_err();
        assert!(matches!(err, BindingError::ShapeMismatch(_)));
    }
}
