// ============================================================
// Layer 4 — Vocabulary
// ============================================================
// Maps every distinct token of one training run's corpus to a
// dense integer index.
//
//   index 0      reserved for padding, never a real token
//   index 1..=N  tokens in first-seen order
//
// There is no frequency threshold: every token seen once is kept.
// The table is rebuilt from scratch on every training run.
//
// Persisted as a JSON object { "coffee": 1, "shop": 2, ... }.
// Loading re-checks that the indices are exactly 1..=N, so a
// hand-edited or truncated file is rejected instead of producing
// sequences that point outside the embedding table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::error::CategorizeError;

/// Index used for right-padding sequences
pub const PAD_INDEX: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HashMap<String, u32>", into = "HashMap<String, u32>")]
pub struct Vocabulary {
    /// tokens[i] has index i + 1
    tokens: Vec<String>,
    index:  HashMap<String, u32>,
}

impl Vocabulary {
    /// Build a vocabulary from token lists, assigning indices in
    /// first-seen order. The corpus order must be reproducible.
    pub fn build<I, T>(corpus: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[String]>,
    {
        let mut tokens: Vec<String>       = Vec::new();
        let mut index: HashMap<String, u32> = HashMap::new();

        for token_list in corpus {
            for token in token_list.as_ref() {
                if !index.contains_key(token) {
                    tokens.push(token.clone());
                    index.insert(token.clone(), tokens.len() as u32);
                }
            }
        }

        tracing::debug!("Built vocabulary with {} tokens", tokens.len());
        Self { tokens, index }
    }

    /// The index of a token, or None when it was never seen
    pub fn get(&self, token: &str) -> Option<u32> {
        self.index.get(token).copied()
    }

    /// Number of real tokens (N)
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Rows an embedding table needs: N tokens plus the padding row
    pub fn embedding_rows(&self) -> usize {
        self.tokens.len() + 1
    }
}

impl TryFrom<HashMap<String, u32>> for Vocabulary {
    type Error = CategorizeError;

    fn try_from(table: HashMap<String, u32>) -> Result<Self, Self::Error> {
        let n = table.len();
        let mut slots: Vec<Option<String>> = vec![None; n];

        for (token, idx) in &table {
            if *idx == PAD_INDEX || *idx as usize > n {
                return Err(CategorizeError::Data(format!(
                    "token '{token}' has index {idx}, expected 1..={n}"
                )));
            }
            let slot = &mut slots[*idx as usize - 1];
            if let Some(other) = slot {
                return Err(CategorizeError::Data(format!(
                    "index {idx} assigned to both '{other}' and '{token}'"
                )));
            }
            *slot = Some(token.clone());
        }

        // n entries, n distinct slots in 1..=n: every slot is filled
        let tokens: Vec<String> = slots.into_iter().flatten().collect();
        Ok(Self { tokens, index: table })
    }
}

impl From<Vocabulary> for HashMap<String, u32> {
    fn from(vocab: Vocabulary) -> Self {
        vocab.index
    }
}
