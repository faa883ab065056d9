// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, enums and traits describing what the
// categorizer works with. Nothing here touches burn, the
// filesystem or the tokenizers crate.
//
//   transaction.rs — Transaction, Feedback, Category and the
//                    TrainingExample derived from them
//   error.rs       — the Load / Prediction / Training taxonomy
//   traits.rs      — TransactionStore, Classifier, Persistable
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

/// Transactions, feedback records, categories and training examples
pub mod transaction;

/// Error taxonomy shared by training and inference
pub mod error;

/// Core abstractions that other layers implement
pub mod traits;
