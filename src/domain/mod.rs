// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and the labelling / reward rules.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain structs, enums, traits and functions
//
// Everything here is deterministic and testable without a device.

/// Failure taxonomy shared by the core
pub mod error;

/// Flat index space: encode / decode references
pub mod index_space;

/// A question + table example with per-token role labels
pub mod example;

/// Ground-truth SQL structure used by the reward
pub mod sql;

/// Structural reward evaluator
pub mod reward;

/// Abstractions implemented by other layers
pub mod traits;
