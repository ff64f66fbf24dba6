// ============================================================
// Layer 3 — Binding Errors
// ============================================================
// Every failure the labelling / policy / reward core can report.
// The application layer wraps these in anyhow with context;
// the core itself never substitutes default values for them.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    /// Region widths used to build labels differ from those used to
    /// decode actions, or the action dimension of a probability
    /// tensor does not match the configured index space.
    #[error("index space mismatch: {0}")]
    ConfigMismatch(String),

    /// Malformed SQL target (selected column outside the column
    /// region, a value span with start > end, ...).
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A probability row that cannot be sampled from.
    #[error("degenerate distribution at batch {batch}, position {position}: {reason}")]
    Distribution {
        batch:    usize,
        position: usize,
        reason:   String,
    },

    #[error("label out of range: {0}")]
    LabelOutOfRange(String),

    #[error("unrecognised role label '{0}'")]
    InvalidLabel(String),

    #[error("invalid index space config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}
