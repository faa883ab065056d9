// ============================================================
// Layer 4 — Transaction Store Loaders
// ============================================================
// Read-only sources of transactions, feedback and categories.
//
// JsonStore reads an export directory:
//
//   data/
//     transactions.json   [{ "id", "description", "category" }, ...]   required
//     feedback.json       [{ "transaction_id", "predicted_category",
//                            "actual_category" }, ...]                 optional
//     categories.json     [{ "id", "name" }, ...]                      optional
//
// A missing optional file reads as an empty list. A file that
// exists but does not parse is an error: training on half a
// corpus is worse than not training.
//
// InMemoryStore holds the three lists directly.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::{fs, path::PathBuf};

use crate::domain::traits::TransactionStore;
use crate::domain::transaction::{Category, Feedback, Transaction};

pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const FEEDBACK_FILE:     &str = "feedback.json";
pub const CATEGORIES_FILE:   &str = "categories.json";

/// Loads records from a directory of JSON exports.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read_list<T: DeserializeOwned>(&self, file: &str, required: bool) -> Result<Vec<T>> {
        let path = self.dir.join(file);

        if !path.exists() {
            if required {
                anyhow::bail!("Required file '{}' does not exist", path.display());
            }
            tracing::debug!("'{}' not found, treating as empty", path.display());
            return Ok(Vec::new());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        let items: Vec<T> = serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse '{}'", path.display()))?;

        tracing::debug!("Read {} records from '{}'", items.len(), path.display());
        Ok(items)
    }
}

impl TransactionStore for JsonStore {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        self.read_list(TRANSACTIONS_FILE, true)
    }

    fn feedback(&self) -> Result<Vec<Feedback>> {
        self.read_list(FEEDBACK_FILE, false)
    }

    fn categories(&self) -> Result<Vec<Category>> {
        self.read_list(CATEGORIES_FILE, false)
    }
}

/// Records held in memory, returned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    pub transactions: Vec<Transaction>,
    pub feedback:     Vec<Feedback>,
    pub categories:   Vec<Category>,
}

impl InMemoryStore {
    pub fn new(transactions: Vec<Transaction>, feedback: Vec<Feedback>) -> Self {
        Self { transactions, feedback, categories: Vec::new() }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }
}

impl TransactionStore for InMemoryStore {
    fn transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.transactions.clone())
    }

    fn feedback(&self) -> Result<Vec<Feedback>> {
        Ok(self.feedback.clone())
    }

    fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_export_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(TRANSACTIONS_FILE),
            r#"[{"id":"t1","description":"Coffee Shop","category":"FOOD"},
                {"id":"t2","description":null,"category":"OTHER"}]"#,
        ).unwrap();
        fs::write(
            dir.path().join(CATEGORIES_FILE),
            r#"[{"id":"FOOD","name":"Food & Drink"}]"#,
        ).unwrap();

        let store = JsonStore::new(dir.path());
        let txs   = store.transactions().unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].description_text(), "Coffee Shop");
        assert_eq!(txs[1].description, None);

        // feedback.json is optional
        assert!(store.feedback().unwrap().is_empty());
        assert_eq!(store.categories().unwrap()[0].name, "Food & Drink");
    }

    #[test]
    fn test_missing_transactions_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonStore::new(dir.path()).transactions().is_err());
    }

    #[test]
    fn test_malformed_feedback_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FEEDBACK_FILE), "{not json").unwrap();
        assert!(JsonStore::new(dir.path()).feedback().is_err());
    }
}
