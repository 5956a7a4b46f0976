//! Tokenization used for truncating over-long inputs.
//!
//! Providers expose a [`Tokenizer`] so the embedding service can cut a text
//! down to its first `max_tokens` tokens before a batch call. Tokens are
//! reported as byte spans into the original text, so truncation is a prefix
//! slice and never allocates.
//!
//! Three tokenizers ship: [`WordTokenizer`] for the hashing provider,
//! [`BpeTokenizer`] (tiktoken `cl100k_base`) for OpenAI models and
//! [`HubTokenizer`] for models published with a Hugging Face `tokenizer.json`.

use tiktoken_rs::{CoreBPE, cl100k_base};
use tracing::warn;

use crate::error::{EmbeddingError, Result};

/// Splits text into tokens reported as `(start, end)` byte offsets.
pub trait Tokenizer: Send + Sync {
    /// Byte spans of every token in `text`, in order.
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)>;

    /// Number of tokens in `text`.
    fn count_tokens(&self, text: &str) -> usize {
        self.token_spans(text).len()
    }

    /// Cut `text` after its first `max_tokens` tokens.
    ///
    /// Returns `None` when the text already fits.
    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> Option<&'a str> {
        let spans = self.token_spans(text);
        if spans.len() <= max_tokens {
            return None;
        }
        let end = match max_tokens.checked_sub(1).and_then(|i| spans.get(i)) {
            Some(&(_, end)) => end,
            None => 0,
        };
        Some(&text[..end])
    }
}

/// Word tokenizer: a token is a maximal run of alphanumeric characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start: Option<usize> = None;

        for (i, c) in text.char_indices() {
            if c.is_alphanumeric() {
                if start.is_none() {
                    start = Some(i);
                }
            } else if let Some(s) = start.take() {
                spans.push((s, i));
            }
        }
        // Last token has no trailing separator
        if let Some(s) = start {
            spans.push((s, text.len()));
        }

        spans
    }
}

/// Byte-pair tokenizer used by OpenAI embedding models.
///
/// A character may be split across several BPE tokens. Its bytes are
/// reported as one span, so [`Tokenizer::token_spans`] can hold fewer spans
/// than [`Tokenizer::count_tokens`] returns.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// The `cl100k_base` encoding of `text-embedding-3-*` and `text-embedding-ada-002`.
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base()
            .map_err(|e| EmbeddingError::ModelLoad(format!("cl100k_base encoding: {e}")))?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer").finish_non_exhaustive()
    }
}

impl Tokenizer for BpeTokenizer {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut start = 0;
        let mut pending = Vec::new();

        for token in self.bpe.encode_ordinary(text) {
            pending.push(token);
            // Partial UTF-8 sequences fail to decode until the last byte arrives
            if let Ok(piece) = self.bpe.decode(pending.clone()) {
                spans.push((start, start + piece.len()));
                start += piece.len();
                pending.clear();
            }
        }

        spans
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }

    fn truncate<'a>(&self, text: &'a str, max_tokens: usize) -> Option<&'a str> {
        let tokens = self.bpe.encode_ordinary(text);
        if tokens.len() <= max_tokens {
            return None;
        }

        // Back off to the last prefix that ends on a character boundary
        let prefix_len = (0..=max_tokens)
            .rev()
            .find_map(|end| self.bpe.decode(tokens[..end].to_vec()).ok())
            .map_or(0, |prefix| prefix.len());
        Some(text.get(..prefix_len).unwrap_or_default())
    }
}

/// Tokenizer loaded from a Hugging Face `tokenizer.json`.
///
/// Spans are the byte offsets the tokenizer reports for each token, with no
/// special tokens added.
pub struct HubTokenizer {
    inner: tokenizers::Tokenizer,
}

impl HubTokenizer {
    /// Fetch `tokenizer.json` from a hub repository, or the local hub cache.
    pub fn from_pretrained(repo: &str) -> Result<Self> {
        tokenizers::Tokenizer::from_pretrained(repo, None)
            .map(Self::from)
            .map_err(|e| EmbeddingError::ModelLoad(format!("tokenizer for {repo}: {e}")))
    }
}

impl From<tokenizers::Tokenizer> for HubTokenizer {
    fn from(inner: tokenizers::Tokenizer) -> Self {
        Self { inner }
    }
}

impl std::fmt::Debug for HubTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubTokenizer").finish_non_exhaustive()
    }
}

impl Tokenizer for HubTokenizer {
    fn token_spans(&self, text: &str) -> Vec<(usize, usize)> {
        match self.inner.encode(text, false) {
            Ok(encoding) => encoding.get_offsets().to_vec(),
            Err(e) => {
                warn!("Tokenization failed: {e}");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_word_spans() {
        let text = "Heart-disease, in 2024!";
        let tokens: Vec<&str> = WordTokenizer
            .token_spans(text)
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect();
        assert_eq!(tokens, vec!["Heart", "disease", "in", "2024"]);
    }

    #[test]
    fn test_unicode_spans() {
        let text = "café über naïve";
        assert_eq!(WordTokenizer.count_tokens(text), 3);
    }

    #[test]
    fn test_truncate_keeps_prefix() {
        let text = "one two three four";
        assert_eq!(WordTokenizer.truncate(text, 2), Some("one two"));
        assert_eq!(WordTokenizer.truncate(text, 4), None);
        assert_eq!(WordTokenizer.truncate(text, 10), None);
    }

    #[test]
    fn test_truncate_to_zero() {
        assert_eq!(WordTokenizer.truncate("one two", 0), Some(""));
    }

    #[test]
    fn test_bpe_counts_subword_tokens() {
        let tokenizer = BpeTokenizer::cl100k().unwrap();
        let text = "Pneumonoultramicroscopicsilicovolcanoconiosis hepaticocholangiogastrostomy";

        assert_eq!(WordTokenizer.count_tokens(text), 2);
        assert!(tokenizer.count_tokens(text) > 2);

        let prefix = tokenizer.truncate(text, 2).unwrap();
        assert!(!prefix.is_empty());
        assert!(prefix.len() < text.len());
        assert!(text.starts_with(prefix));
    }

    #[test]
    fn test_bpe_spans_cover_text() {
        let tokenizer = BpeTokenizer::cl100k().unwrap();
        let text = "Heart disease in 2024";

        let spans = tokenizer.token_spans(text);
        assert_eq!(spans.len(), tokenizer.count_tokens(text));
        assert_eq!(spans.first().map(|s| s.0), Some(0));
        assert_eq!(spans.last().map(|s| s.1), Some(text.len()));
        assert_eq!(tokenizer.truncate(text, spans.len()), None);
    }

    #[test]
    fn test_bpe_truncate_stays_on_char_boundary() {
        let tokenizer = BpeTokenizer::cl100k().unwrap();
        let text = "糖尿病と心臓病のリスク café naïve";

        for max_tokens in 0..tokenizer.count_tokens(text) {
            let prefix = tokenizer.truncate(text, max_tokens).unwrap();
            assert!(text.starts_with(prefix));
        }
        assert_eq!(tokenizer.truncate(text, 0), Some(""));
    }

    #[test]
    fn test_hub_tokenizer_spans() {
        let json = r#"{
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [],
            "normalizer": null,
            "pre_tokenizer": {"type": "Whitespace"},
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": {"[UNK]": 0, "heart": 1, "disease": 2},
                "unk_token": "[UNK]"
            }
        }"#;
        let tokenizer = HubTokenizer::from(tokenizers::Tokenizer::from_str(json).unwrap());
        let text = "Heart disease, again";

        assert_eq!(
            tokenizer.token_spans(text),
            vec![(0, 5), (6, 13), (13, 14), (15, 20)]
        );
        assert_eq!(tokenizer.truncate(text, 2), Some("Heart disease"));
    }
}
