// ============================================================
// Layer 4 — Binding Batcher
// ============================================================
// Stacks BindingSamples into one batch:
//
//   pointer_labels  [batch, tokenize_max_len]  Int tensor
//   gate_labels     [batch, tokenize_max_len]  Int tensor
//   lengths         host-side, one per sample
//   targets         host-side, one SqlTarget per sample
//
// Targets stay on the host because the structural reward is a
// rule-based comparison, not tensor arithmetic. The batch also
// carries the IndexSpaceConfig its labels were built with, so a
// policy can refuse to score against different region widths.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::BindingSample;
use crate::domain::index_space::IndexSpaceConfig;
use crate::domain::sql::SqlTarget;

#[derive(Debug, Clone)]
pub struct BindingBatch<B: Backend> {
    pub pointer_labels: Tensor<B, 2, Int>,
    pub gate_labels:    Tensor<B, 2, Int>,
    pub lengths:        Vec<usize>,
    pub targets:        Vec<SqlTarget>,
    pub index_space:    IndexSpaceConfig,
}

impl<B: Backend> BindingBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }
}

#[derive(Clone, Debug)]
pub struct BindingBatcher<B: Backend> {
    pub device:      B::Device,
    pub index_space: IndexSpaceConfig,
}

impl<B: Backend> BindingBatcher<B> {
    pub fn new(device: B::Device, index_space: IndexSpaceConfig) -> Self {
        Self { device, index_space }
    }
}

impl<B: Backend> Batcher<BindingSample, BindingBatch<B>> for BindingBatcher<B> {
    fn batch(&self, items: Vec<BindingSample>) -> BindingBatch<B> {
        let batch_size = items.len();
        let seq_len    = self.index_space.tokenize_max_len;

        // Samples are already padded to tokenize_max_len by the labeller
        let pointer_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.pointer_label.iter().map(|&x| x as i32))
            .collect();
        let gate_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.gate_label.iter().map(|&x| x as i32))
            .collect();

        let pointer_labels = Tensor::<B, 1, Int>::from_ints(pointer_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let gate_labels = Tensor::<B, 1, Int>::from_ints(gate_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let (lengths, targets): (Vec<usize>, Vec<SqlTarget>) = items
            .into_iter()
            .map(|s| (s.length, s.target))
            .unzip();

        BindingBatch {
            pointer_labels,
            gate_labels,
            lengths,
            targets,
            index_space: self.index_space,
        }
    }
}
