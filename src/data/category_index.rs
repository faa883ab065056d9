// ============================================================
// Layer 4 — Category Index
// ============================================================
// Bijection between category ids and the dense class indices
// the model's output layer is laid out in.
//
//   class 0 ↔ first category id seen in the corpus
//   class 1 ↔ second distinct category id
//   ...
//
// Built once per training run from exactly the labels of that
// run. A category with no example in the run has no class and
// cannot be predicted until a later run includes it.
//
// Persisted as { "0": "FOOD", "1": "TRANSPORT" }.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::error::CategorizeError;
use crate::domain::transaction::CategoryId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<usize, CategoryId>", into = "BTreeMap<usize, CategoryId>")]
pub struct CategoryIndex {
    classes: Vec<CategoryId>,
    lookup:  HashMap<CategoryId, usize>,
}

impl CategoryIndex {
    /// Build from the labels of a corpus, in corpus order.
    pub fn build<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes = Vec::new();
        let mut lookup  = HashMap::new();
        for label in labels {
            let label = label.as_ref();
            if !lookup.contains_key(label) {
                lookup.insert(label.to_string(), classes.len());
                classes.push(label.to_string());
            }
        }
        Self { classes, lookup }
    }

    /// Class index for a category id
    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.lookup.get(category).copied()
    }

    /// Category id for a class index
    pub fn decode(&self, class: usize) -> Option<&CategoryId> {
        self.classes.get(class)
    }

    /// One-hot target row of width K for a category id
    pub fn one_hot(&self, category: &str) -> Option<Vec<f32>> {
        let class = self.index_of(category)?;
        let mut row = vec![0.0; self.classes.len()];
        row[class] = 1.0;
        Some(row)
    }

    /// Number of classes (K)
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl TryFrom<BTreeMap<usize, CategoryId>> for CategoryIndex {
    type Error = CategorizeError;

    fn try_from(table: BTreeMap<usize, CategoryId>) -> Result<Self, Self::Error> {
        let mut classes = Vec::with_capacity(table.len());
        let mut lookup  = HashMap::with_capacity(table.len());

        // BTreeMap iterates in key order, so keys must read 0, 1, 2, ...
        for (expected, (class, category)) in table.into_iter().enumerate() {
            if class != expected {
                return Err(CategorizeError::Data(format!(
                    "class index {class} found where {expected} was expected"
                )));
            }
            if lookup.insert(category.clone(), class).is_some() {
                return Err(CategorizeError::Data(format!(
                    "category '{category}' mapped to more than one class"
                )));
            }
            classes.push(category);
        }
        Ok(Self { classes, lookup })
    }
}

impl From<CategoryIndex> for BTreeMap<usize, CategoryId> {
    fn from(index: CategoryIndex) -> Self {
        index.classes.into_iter().enumerate().collect()
    }
}
