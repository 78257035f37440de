//! Token estimation for produced artifacts.
//!
//! The estimator approximates BPE-style tokenizers without shipping a
//! vocabulary: `max(words, ceil(chars / 4))`. Both inputs shrink (or hold)
//! under the normalization passes, so compressed text never counts higher
//! than its source.

/// Assumed average characters per token for English-ish prose and code.
const CHARS_PER_TOKEN: usize = 4;

/// Counts tokens in a piece of text.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Default counter: word/character blend estimate.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimatingCounter;

impl TokenCounter for EstimatingCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count();
        let words = text.split_whitespace().count();
        words.max(chars.div_ceil(CHARS_PER_TOKEN))
    }
}

/// Count tokens with the default estimator.
pub fn count_tokens(text: &str) -> usize {
    EstimatingCounter.count(text)
}
