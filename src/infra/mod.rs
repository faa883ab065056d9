// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting storage concerns:
//
//   artifact.rs — publishing and loading the model artifact
//                 (weights + vocabulary + category index) as
//                 one atomic, versioned set
//
//   metrics.rs  — per-epoch training metrics written as CSV
//                 into the artifact being published
//
// Reference: Burn Book §5 (Records and Checkpointing)

/// Versioned model artifact publishing and loading
pub mod artifact;

/// Training metrics CSV logger
pub mod metrics;
