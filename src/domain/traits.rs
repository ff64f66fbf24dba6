// ============================================================
// Layer 3 — Core Traits
// ============================================================
// The application layer only sees ExampleSource, so a split can
// come from a JSON-lines file today and anything else later.

use anyhow::Result;

use crate::domain::example::Example;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Any component that can load the examples of one split.
///
/// Implementations:
///   - JsonlLoader → one JSON object per line
pub trait ExampleSource {
    fn load_all(&self) -> Result<Vec<Example>>;
}
