//! Transaction categorization: learns a spending category for free-text
//! transaction descriptions and serves predictions from a persisted,
//! versioned model artifact.
//!
//! The crate is layered the same way the CLI uses it:
//!
//! ```text
//!   cli          (binary only)   train / predict / info
//!   application                  TrainUseCase, CategorizerService
//!   domain                       Transaction, Feedback, Category, errors, traits
//!   data                         tokenizer, vocabulary, encoder, category index
//!   ml                           burn model, training loop, inferencer
//!   infra                        artifact store, metrics log
//! ```

#![recursion_limit = "256"]

pub mod application;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;

pub use application::categorizer::{CategorizerService, ModelMetadata, ServiceState};
pub use application::train_use_case::{TrainConfig, TrainReport, TrainUseCase};
pub use domain::error::{CategorizeError, TrainStage};
pub use domain::transaction::{Category, CategoryId, Feedback, Transaction};
