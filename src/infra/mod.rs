// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by the use cases:
//
//   store.rs      index_space.json, label_config.json and the
//                 per-split label files
//
//   metrics.rs    one CSV row per scoring run

/// Artifact persistence (index space, label config, label files)
pub mod store;

/// Scoring metrics CSV logger
pub mod metrics;
