// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From annotated JSON lines to tensor batches:
//
//   split.jsonl
//       │
//       ▼
//   JsonlLoader       → Example (tokens, role labels, SqlTarget)
//       │
//       ▼
//   Labeler           → pointer + gate labels in the flat index space
//       │
//       ▼
//   BindingDataset    → implements Burn's Dataset trait
//       │
//       ▼
//   BindingBatcher    → label tensors + host-side targets
//
// The IndexSpaceConfig threaded through every step is computed
// once from the training split.

/// Reads annotated examples and decoder predictions from .jsonl
pub mod loader;

/// Role labels → pointer / gate labels
pub mod labeler;

/// Implements Burn's Dataset trait for labelled samples
pub mod dataset;

/// Implements Burn's Batcher trait
pub mod batcher;
