// File: src/core/provenance.rs
use crate::core::types::{Candidate, Technique};
use std::collections::{BTreeMap, BTreeSet};

/// Candidates proposed for one token position, each with the set of
/// techniques that proposed it.
#[derive(Debug, Default, Clone)]
pub struct Provenance {
    sources: BTreeMap<String, BTreeSet<Technique>>,
}

impl Provenance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `technique` proposed each of `words`.
    pub fn add<I, S>(&mut self, technique: Technique, words: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for word in words {
            self.sources.entry(word.into()).or_default().insert(technique);
        }
    }

    pub fn sources(&self, word: &str) -> BTreeSet<Technique> {
        self.sources.get(word).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// All proposals in lexical order.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.sources.iter().map(|(text, provenance)| Candidate {
            text: text.clone(),
            provenance: provenance.clone(),
        })
    }

    pub fn texts(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}
