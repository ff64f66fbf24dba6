// ============================================================
// Layer 4 — Binding Dataset
// ============================================================
// Holds every example of one split already labelled against a
// fixed IndexSpaceConfig. Implements Burn's Dataset trait so the
// batcher can pull samples by index:
//
//   get(i)  → BindingSample (pointer + gate labels, length, target)
//   len()   → number of labelled examples
//
// SQL targets are padded with sentinels to the widest condition
// list in the split, so every sample in a batch has the same shape.

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::data::labeler::{Labeler, PointerLabels};
use crate::domain::error::BindingError;
use crate::domain::example::Example;
use crate::domain::index_space::IndexSpaceConfig;
use crate::domain::sql::SqlTarget;

/// One labelled example, padded to the split-wide widths.
/// Labels are computed once at load time and never change afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSample {
    pub pointer_label: Vec<i64>,
    pub gate_label:    Vec<i64>,
    /// Question length clipped to tokenize_max_len
    pub length:        usize,
    pub target:        SqlTarget,
}

impl BindingSample {
    pub fn labels(&self) -> PointerLabels {
        PointerLabels { pointer: self.pointer_label.clone(), gate: self.gate_label.clone() }
    }
}

pub struct BindingDataset {
    samples: Vec<BindingSample>,
}

impl BindingDataset {
    /// Label every example against `index_space`. The first example that
    /// does not fit the index space aborts the build.
    pub fn build(examples: &[Example], index_space: IndexSpaceConfig) -> Result<Self, BindingError> {
        let labeler = Labeler::new(index_space);
        let conds_width = examples
            .iter()
            .map(|e| e.target.conds_cols.len().max(e.target.conds_values.len()))
            .max()
            .unwrap_or(0);

        let samples = examples
            .iter()
            .map(|example| {
                let labels = labeler.label(example)?;
                example.target.validate(&index_space)?;
                Ok(BindingSample {
                    pointer_label: labels.pointer,
                    gate_label:    labels.gate,
                    length:        example.token_count().min(index_space.tokenize_max_len),
                    target:        example.target.clone().padded(conds_width),
                })
            })
            .collect::<Result<Vec<_>, BindingError>>()?;

        tracing::debug!(
            "Built dataset of {} samples, action space {}",
            samples.len(),
            index_space.action_space_size()
        );
        Ok(Self { samples })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Pointer + gate labels in sample order, for writing to disk.
    pub fn labels(&self) -> Vec<PointerLabels> {
        self.samples.iter().map(BindingSample::labels).collect()
    }
}

impl Dataset<BindingSample> for BindingDataset {
    fn get(&self, index: usize) -> Option<BindingSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::RoleLabel;
    use crate::domain::index_space::{LabelVariant, SENTINEL};

    fn example(n_tokens: usize, target: SqlTarget) -> Example {
        Example {
            table_id: None,
            tokens: vec!["w".into(); n_tokens],
            labels: vec![RoleLabel::Unknown; n_tokens],
            columns_split_marker_len: 4,
            cells_split_marker_len: 3,
            target,
        }
    }

    fn space() -> IndexSpaceConfig {
        IndexSpaceConfig::new(LabelVariant::GateRelative { cell_info: true }, 4, 4, 3).unwrap()
    }

    #[test]
    fn test_targets_are_padded_to_split_width() {
        let examples = vec![
            example(2, SqlTarget::new(0, vec![1, 2], vec![[0, 1], [1, 2]])),
            example(3, SqlTarget::new(1, vec![], vec![])),
        ];
        let ds = BindingDataset::build(&examples, space()).unwrap();
        assert_eq!(ds.len(), 2);
        let second = ds.get(1).unwrap();
        assert_eq!(second.target.conds_cols, vec![SENTINEL, SENTINEL]);
        assert_eq!(second.target.conds_values, vec![[SENTINEL, SENTINEL]; 2]);
        assert_eq!(second.length, 3);
    }

    #[test]
    fn test_length_is_clipped() {
        let ds = BindingDataset::build(&[example(9, SqlTarget::new(0, vec![], vec![]))], space()).unwrap();
        assert_eq!(ds.get(0).unwrap().length, 4);
    }

    #[test]
    fn test_invalid_target_aborts_build() {
        let res = BindingDataset::build(&[example(2, SqlTarget::new(5, vec![], vec![]))], space());
        assert!(matches!(res, Err(BindingError::InvalidTarget(_))));
    }

    #[test]
    fn test_out_of_bounds_index() {
        let ds = BindingDataset::build(&[], space()).unwrap();
        assert!(ds.get(0).is_none());
        assert_eq!(ds.sample_count(), 0);
    }
}
