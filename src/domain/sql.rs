// ============================================================
// Layer 3 — SQL Target
// ============================================================
// The parts of a ground-truth query the structural reward looks at:
//
//   sel_col       the selected column ordinal
//   conds_cols    columns used in WHERE conditions
//   conds_values  [start, end) spans into the question tokens
//                 covering each condition value
//
// Absent slots are padded with SENTINEL so every target in a
// split has the same width.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::BindingError;
use crate::domain::index_space::{IndexSpaceConfig, SENTINEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlTarget {
    pub sel_col:      i64,
    pub conds_cols:   Vec<i64>,
    pub conds_values: Vec<[i64; 2]>,
}

impl SqlTarget {
    pub fn new(sel_col: i64, conds_cols: Vec<i64>, conds_values: Vec<[i64; 2]>) -> Self {
        Self { sel_col, conds_cols, conds_values }
    }

    /// Pad both condition lists with sentinels up to `width`.
    pub fn padded(mut self, width: usize) -> Self {
        if self.conds_cols.len() < width {
            self.conds_cols.resize(width, SENTINEL);
        }
        if self.conds_values.len() < width {
            self.conds_values.resize(width, [SENTINEL, SENTINEL]);
        }
        self
    }

    pub fn validate(&self, index_space: &IndexSpaceConfig) -> Result<(), BindingError> {
        let slots = index_space.column_slots() as i64;
        if self.sel_col < 0 || self.sel_col >= slots {
            return Err(BindingError::InvalidTarget(format!(
                "selected column {} outside {slots} column slots",
                self.sel_col
            )));
        }
        if let Some(c) = self.conds_cols.iter().find(|&&c| c < 0 && c != SENTINEL) {
            return Err(BindingError::InvalidTarget(format!("condition column {c}")));
        }
        for &[start, end] in &self.conds_values {
            if start == SENTINEL {
                continue;
            }
            if start < 0 || start > end {
                return Err(BindingError::InvalidTarget(format!(
                    "condition value span [{start}, {end})"
                )));
            }
        }
        Ok(())
    }

    /// Real condition columns, sentinels dropped.
    pub fn condition_columns(&self) -> HashSet<usize> {
        self.conds_cols
            .iter()
            .filter(|&&c| c >= 0)
            .map(|&c| c as usize)
            .collect()
    }

    /// Every token position covered by a value span, in span order.
    pub fn value_positions(&self) -> Vec<usize> {
        self.conds_values
            .iter()
            .filter(|span| span[0] != SENTINEL)
            .flat_map(|&[start, end]| (start.max(0) as usize)..(end.max(0) as usize))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index_space::LabelVariant;

    fn space() -> IndexSpaceConfig {
        IndexSpaceConfig::new(LabelVariant::GateRelative { cell_info: true }, 5, 4, 3).unwrap()
    }

    #[test]
    fn test_padding_uses_sentinels() {
        let t = SqlTarget::new(1, vec![2], vec![[3, 4]]).padded(3);
        assert_eq!(t.conds_cols, vec![2, SENTINEL, SENTINEL]);
        assert_eq!(t.conds_values[2], [SENTINEL, SENTINEL]);
        assert_eq!(t.condition_columns().len(), 1);
    }

    #[test]
    fn test_value_positions_skip_sentinels_and_keep_order() {
        let t = SqlTarget::new(0, vec![1, 2, SENTINEL], vec![[5, 7], [1, 2], [SENTINEL, SENTINEL]]);
        assert_eq!(t.value_positions(), vec![5, 6, 1]);
    }

    #[test]
    fn test_condition_columns_drop_sentinels() {
        let t = SqlTarget::new(0, vec![SENTINEL, 2], vec![]);
        assert_eq!(t.condition_columns(), HashSet::from([2]));
    }

    #[test]
    fn test_rejects_selected_column_outside_region() {
        let t = SqlTarget::new(3, vec![], vec![]);
        assert!(matches!(t.validate(&space()), Err(BindingError::InvalidTarget(_))));
    }

    #[test]
    fn test_rejects_reversed_span() {
        let t = SqlTarget::new(0, vec![1], vec![[4, 2]]);
        assert!(matches!(t.validate(&space()), Err(BindingError::InvalidTarget(_))));
    }

    #[test]
    fn test_accepts_empty_span_and_sentinels() {
        let t = SqlTarget::new(0, vec![1, SENTINEL], vec![[2, 2], [SENTINEL, SENTINEL]]);
        assert!(t.validate(&space()).is_ok());
        assert!(t.value_positions().is_empty());
    }
}
