// ============================================================
// Layer 4 — Description Tokenizer
// ============================================================
// Turns a raw transaction description into lowercase word tokens.
//
// Uses the same building blocks a HuggingFace tokenizer.json
// declares, applied directly instead of through a trained model:
//   normalizer    : Lowercase
//   pre_tokenizer : Whitespace  (splits on \w+|[^\w\s]+)
//
// Pieces with no alphanumeric character ("*", "#", "-") are
// separators, not words, and are discarded.
//
//   "AMZN Mktp*2K4 Seattle" → ["amzn", "mktp", "2k4", "seattle"]
//
// A null or empty description yields an empty list. The
// tokenizer never fails: a pipeline error is logged and treated
// as "no tokens".

use tokenizers::normalizers::Lowercase;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::{Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

#[derive(Debug, Clone)]
pub struct Tokenizer {
    normalizer:    Lowercase,
    pre_tokenizer: Whitespace,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            normalizer:    Lowercase,
            pre_tokenizer: Whitespace::default(),
        }
    }

    /// Tokenize one description.
    pub fn tokenize(&self, description: Option<&str>) -> Vec<String> {
        let text = match description {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Vec::new(),
        };

        match self.split(text) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!("Tokenizer pipeline failed, treating description as empty: {e}");
                Vec::new()
            }
        }
    }

    /// Tokenize every description independently, preserving order.
    pub fn tokenize_batch<S: AsRef<str>>(&self, descriptions: &[S]) -> Vec<Vec<String>> {
        descriptions
            .iter()
            .map(|d| self.tokenize(Some(d.as_ref())))
            .collect()
    }

    fn split(&self, text: &str) -> tokenizers::Result<Vec<String>> {
        let mut pretokenized = PreTokenizedString::from(text);
        pretokenized.normalize(|n| self.normalizer.normalize(n))?;
        self.pre_tokenizer.pre_tokenize(&mut pretokenized)?;

        Ok(pretokenized
            .get_splits(OffsetReferential::Normalized, OffsetType::Char)
            .into_iter()
            .map(|(piece, _, _)| piece)
            .filter(|piece| piece.chars().any(char::is_alphanumeric))
            .map(str::to_string)
            .collect())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits() {
        let t = Tokenizer::new();
        assert_eq!(t.tokenize(Some("Coffee SHOP")), vec!["coffee", "shop"]);
    }

    #[test]
    fn test_null_and_empty_give_no_tokens() {
        let t = Tokenizer::new();
        assert!(t.tokenize(None).is_empty());
        assert!(t.tokenize(Some("")).is_empty());
        assert!(t.tokenize(Some("   ")).is_empty());
        assert_eq!(t.tokenize(None), t.tokenize(Some("")));
    }

    #[test]
    fn test_punctuation_is_a_boundary_not_a_token() {
        let t = Tokenizer::new();
        assert_eq!(
            t.tokenize(Some("AMZN Mktp*2K4 -- Seattle, WA")),
            vec!["amzn", "mktp", "2k4", "seattle", "wa"]
        );
        assert!(t.tokenize(Some("*** // ---")).is_empty());
    }

    #[test]
    fn test_tokens_are_always_lowercase() {
        let t = Tokenizer::new();
        let inputs = [
            "UBER   *TRIP HELP.UBER.COM",
            "Starbucks Store #1234",
            "ÉPICERIE Ça Va",
            "Netflix.com 866-579-7172 CA",
        ];
        for input in inputs {
            for token in t.tokenize(Some(input)) {
                assert_eq!(token, token.to_lowercase(), "token from {input:?}");
                assert!(!token.is_empty());
            }
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let t = Tokenizer::new();
        let batch = t.tokenize_batch(&["Gas Station", "", "coffee"]);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], t.tokenize(Some("Gas Station")));
        assert!(batch[1].is_empty());
        assert_eq!(batch[2], vec!["coffee"]);
    }
}
