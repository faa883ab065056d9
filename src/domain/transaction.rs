// ============================================================
// Layer 3 — Transaction Domain Types
// ============================================================
// The three records read from the transaction store, plus the
// training example the orchestrator derives from them.
//
// A feedback record only carries a reference to its transaction;
// the description is resolved through that reference when the
// training corpus is collected.

use serde::{Deserialize, Serialize};

/// Opaque category identifier, e.g. "FOOD" or a database key.
pub type CategoryId = String;

/// A historical, labelled transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,

    /// Free-text description as exported by the bank. May be null.
    #[serde(default)]
    pub description: Option<String>,

    /// The category the user filed this transaction under
    pub category: CategoryId,
}

impl Transaction {
    pub fn new(
        id:          impl Into<String>,
        description: impl Into<String>,
        category:    impl Into<CategoryId>,
    ) -> Self {
        Self {
            id:          id.into(),
            description: Some(description.into()),
            category:    category.into(),
        }
    }

    /// The description, or "" when it is null
    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// A user's reaction to a prediction made for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub transaction_id:     String,
    pub predicted_category: CategoryId,
    pub actual_category:    CategoryId,
}

impl Feedback {
    pub fn new(
        transaction_id: impl Into<String>,
        predicted:      impl Into<CategoryId>,
        actual:         impl Into<CategoryId>,
    ) -> Self {
        Self {
            transaction_id:     transaction_id.into(),
            predicted_category: predicted.into(),
            actual_category:    actual.into(),
        }
    }

    /// True when the user overrode the predicted category.
    /// Only corrections contribute a training example.
    pub fn is_correction(&self) -> bool {
        self.predicted_category != self.actual_category
    }
}

/// A spending category as the rest of the application knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id:   CategoryId,
    pub name: String,
}

impl Category {
    pub fn new(id: impl Into<CategoryId>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Where a training example came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExampleOrigin {
    Transaction,
    Correction,
}

/// One (description, label) pair of the training corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub description: String,
    pub label:       CategoryId,
    pub origin:      ExampleOrigin,
}

impl TrainingExample {
    pub fn new(
        description: impl Into<String>,
        label:       impl Into<CategoryId>,
        origin:      ExampleOrigin,
    ) -> Self {
        Self { description: description.into(), label: label.into(), origin }
    }
}
