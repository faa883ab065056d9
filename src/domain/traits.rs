// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between layers:
//   - TransactionStore: where the training corpus is read from
//     (JSON directory, in-memory fixture, a future database)
//   - Classifier: anything that turns encoded sequences into
//     class probabilities (the burn model, or a stub in tests)
//   - Persistable: model weights that can be written into and
//     read back from an artifact directory
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use std::path::Path;

use anyhow::Result;

use crate::domain::transaction::{Category, Feedback, Transaction};

// ─── TransactionStore ─────────────────────────────────────────────────────────
/// Read-only access to the records a training run learns from.
///
/// Implementations:
///   - JsonStore     → a directory of exported JSON files
///   - InMemoryStore → records held in memory
pub trait TransactionStore {
    /// Every labelled transaction, in a stable order
    fn transactions(&self) -> Result<Vec<Transaction>>;

    /// Every feedback record, in a stable order
    fn feedback(&self) -> Result<Vec<Feedback>>;

    /// The category table (id → display name)
    fn categories(&self) -> Result<Vec<Category>>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// Scores fixed-length token sequences.
pub trait Classifier {
    /// Number of classes each probability row covers
    fn num_classes(&self) -> usize;

    /// One forward pass over the whole batch.
    /// Returns one probability row per input sequence, same order.
    fn predict_proba(&self, sequences: &[Vec<u32>]) -> Result<Vec<Vec<f32>>>;
}

// ─── Persistable ──────────────────────────────────────────────────────────────
/// Model weights that can be saved into, and restored from, a directory.
pub trait Persistable: Sized {
    /// Write this component's files into `dir`
    fn save(&self, dir: &Path) -> Result<()>;

    /// Restore the component from files previously written into `dir`
    fn load(dir: &Path) -> Result<Self>;
}
