// ============================================================
// Layer 5 — ML / Policy Layer (Burn)
// ============================================================
// Everything that touches decoder output tensors lives here.
// The decoder itself is an external collaborator: this layer
// consumes its [batch, steps, K] probabilities and hands back
// sampled / greedy action sequences, rewards and losses.
//
//   policy.rs       categorical + greedy step policies,
//                   post-hoc length masking
//
//   objective.rs    REINFORCE loss and pointer NLL as
//                   differentiable tensor expressions

/// Categorical and greedy step policies
pub mod policy;

/// Policy-gradient and warm-start losses
pub mod objective;

/// CPU backend used by the command-line workflows.
pub type HostBackend = burn::backend::NdArray;
