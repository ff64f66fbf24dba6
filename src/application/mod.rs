// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one workflow each.
//
// Rules for this layer:
//   - No probability or reward arithmetic here (Layers 3 and 5)
//   - No argument parsing or printing here (Layer 1)
//   - File formats belong to Layers 4 and 6
//   - Only workflow coordination

// Label construction for the training (and dev) split
pub mod label_use_case;

// Scoring a decoder's probabilities against a split
pub mod score_use_case;
