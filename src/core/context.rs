// File: src/core/context.rs
use crate::oracle::LanguageModel;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::trace;

/// The immediate neighbours of a token. An empty side is a sentence boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrigramWindow {
    pub left: String,
    pub right: String,
}

impl TrigramWindow {
    /// Neighbours of `index` taken from `tokens`.
    pub fn around(tokens: &[String], index: usize) -> Self {
        let left = index
            .checked_sub(1)
            .and_then(|i| tokens.get(i))
            .cloned()
            .unwrap_or_default();
        let right = tokens.get(index + 1).cloned().unwrap_or_default();
        Self { left, right }
    }

    pub fn with_left(mut self, left: &str) -> Self {
        self.left = left.to_string();
        self
    }

    pub fn score(&self, model: &dyn LanguageModel, word: &str) -> f64 {
        score_in_context(model, &self.left, word, &self.right)
    }
}

/// Scores `left word right`, flagging the sentence start or end when a side is empty.
pub fn score_in_context(model: &dyn LanguageModel, left: &str, word: &str, right: &str) -> f64 {
    let text = [left, word, right]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    model.score(&text, left.is_empty(), right.is_empty())
}

/// Wraps a model and answers repeated queries from a cache.
/// Meant to live for one sentence: every candidate of every token costs an
/// oracle call, and the same trigram is often asked for more than once.
pub struct CachedModel<'m> {
    model: &'m dyn LanguageModel,
    cache: RefCell<HashMap<(String, bool, bool), f64>>,
}

impl<'m> CachedModel<'m> {
    pub fn new(model: &'m dyn LanguageModel) -> Self {
        Self {
            model,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Number of distinct queries forwarded to the wrapped model.
    pub fn misses(&self) -> usize {
        self.cache.borrow().len()
    }
}

impl LanguageModel for CachedModel<'_> {
    fn score(&self, text: &str, bos: bool, eos: bool) -> f64 {
        let key = (text.to_string(), bos, eos);
        if let Some(&score) = self.cache.borrow().get(&key) {
            return score;
        }
        let score = self.model.score(text, bos, eos);
        trace!(text, bos, eos, score, "oracle query");
        self.cache.borrow_mut().insert(key, score);
        score
    }
}
