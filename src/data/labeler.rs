// ============================================================
// Layer 4 — Pointer / Gate Labeller
// ============================================================
// Turns an example's per-token role labels into the two
// supervised target sequences the warm-start phase trains on:
//
//   pointer  flat index-space label per token
//   gate     0 none / 1 column / 2 value per token
//
// Both are truncated / padded to tokenize_max_len with SENTINEL.
// A role outside the declared region widths is an error; it is
// never clamped.

use serde::{Deserialize, Serialize};

use crate::domain::error::BindingError;
use crate::domain::example::Example;
use crate::domain::index_space::{IndexSpaceConfig, SENTINEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerLabels {
    pub pointer: Vec<i64>,
    pub gate:    Vec<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct Labeler {
    index_space: IndexSpaceConfig,
}

impl Labeler {
    pub fn new(index_space: IndexSpaceConfig) -> Self {
        Self { index_space }
    }

    pub fn label(&self, example: &Example) -> Result<PointerLabels, BindingError> {
        let max_len = self.index_space.tokenize_max_len;
        let mut pointer = Vec::with_capacity(max_len);
        let mut gate    = Vec::with_capacity(max_len);

        for (position, role) in example.labels.iter().take(max_len).enumerate() {
            let (flat, g) = self
                .index_space
                .encode(position, role.reference())
                .map_err(|e| match e {
                    BindingError::LabelOutOfRange(msg) => BindingError::LabelOutOfRange(format!(
                        "token {position} ({:?}): {msg}",
                        example.tokens.get(position)
                    )),
                    other => other,
                })?;
            pointer.push(flat);
            gate.push(g.code());
        }

        pointer.resize(max_len, SENTINEL);
        gate.resize(max_len, SENTINEL);
        Ok(PointerLabels { pointer, gate })
    }
}
