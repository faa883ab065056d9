// ============================================================
// Layer 4 — Sequence Encoder
// ============================================================
// Token list + vocabulary → fixed-length integer sequence.
//
//   1. look every token up in the vocabulary
//   2. drop tokens the vocabulary has never seen (no UNK slot)
//   3. truncate to the first `max_len` indices
//   4. right-pad with PAD_INDEX (0) up to `max_len`
//
// Example with max_len = 6, vocab {coffee:1, shop:2}:
//   ["coffee", "bean", "shop"] → [1, 2, 0, 0, 0, 0]
//
// Every output has length exactly `max_len`, so batches can be
// stacked into a [batch, max_len] tensor without further padding.

use crate::data::tokenizer::Tokenizer;
use crate::data::vocabulary::{Vocabulary, PAD_INDEX};

/// Fixed sequence length fed to the model
pub const MAX_SEQ_LEN: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct SequenceEncoder {
    max_len: usize,
}

impl SequenceEncoder {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// Encode one token list.
    pub fn encode(&self, tokens: &[String], vocab: &Vocabulary) -> Vec<u32> {
        let mut sequence: Vec<u32> = tokens
            .iter()
            .filter_map(|t| vocab.get(t))
            .take(self.max_len)
            .collect();
        sequence.resize(self.max_len, PAD_INDEX);
        sequence
    }

    /// Encode many token lists; each element is encoded exactly as
    /// `encode` would encode it on its own.
    pub fn encode_batch(&self, batch: &[Vec<String>], vocab: &Vocabulary) -> Vec<Vec<u32>> {
        batch.iter().map(|tokens| self.encode(tokens, vocab)).collect()
    }

    /// Tokenize and encode a raw description in one step
    pub fn encode_text(
        &self,
        tokenizer:   &Tokenizer,
        description: Option<&str>,
        vocab:       &Vocabulary,
    ) -> Vec<u32> {
        self.encode(&tokenizer.tokenize(description), vocab)
    }
}

impl Default for SequenceEncoder {
    fn default() -> Self {
        Self::new(MAX_SEQ_LEN)
    }
}
