// src/core/types.rs
use std::collections::BTreeSet;
use std::fmt;

/// Position of a token inside its sentence.
pub type TokenIndex = usize;

/// Classification of a single token before any rewriting happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// Punctuation, emoticons, mentions, hashtags, urls, names, compounds.
    Skip,
    InVocab,
    OutOfVocab,
}

/// Direction a sentence is rewritten in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Turn in-vocabulary tokens into plausible noisy spellings.
    Noisify,
    /// Repair out-of-vocabulary tokens into their standard form.
    Clean,
}

/// An independent evidence source that can propose a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Technique {
    Typo,
    Embedding,
    ClusterAbbreviation,
    ClusterCommon,
    Split,
    Shorten,
}

impl Technique {
    pub fn name(&self) -> &'static str {
        match self {
            Technique::Typo => "typo",
            Technique::Embedding => "embedding",
            Technique::ClusterAbbreviation => "cluster-abbreviation",
            Technique::ClusterCommon => "cluster-common",
            Technique::Split => "split",
            Technique::Shorten => "shorten",
        }
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A proposed replacement for one token, with the techniques that proposed it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub provenance: BTreeSet<Technique>,
}

impl Candidate {
    /// A candidate may only be accepted when two independent techniques agree.
    pub fn is_corroborated(&self) -> bool {
        self.provenance.len() >= 2
    }
}

/// State of a token position that was picked for rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSlot {
    Unresolved,
    Resolved(String),
}

/// Sparse map from token position to its rewriting state; lives for one sentence.
pub type PositionMap = std::collections::BTreeMap<TokenIndex, TokenSlot>;

/// Whether an emitted token was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    Unchanged,
    Changed,
}

impl PairStatus {
    pub fn between(raw: &str, normalized: &str) -> Self {
        if raw == normalized {
            PairStatus::Unchanged
        } else {
            PairStatus::Changed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PairStatus::Unchanged => "IV",
            PairStatus::Changed => "OOV",
        }
    }
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One aligned output line: the noisy form, its status and the clean form.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub raw: String,
    pub status: PairStatus,
    pub normalized: String,
}

impl TokenPair {
    pub fn new(raw: &str, normalized: &str) -> Self {
        Self {
            raw: raw.to_string(),
            status: PairStatus::between(raw, normalized),
            normalized: normalized.to_string(),
        }
    }
}

/// A single accepted substitution, kept for the debug report.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub index: TokenIndex,
    pub from: String,
    pub to: String,
    pub score: f64,
    /// Every candidate considered for this position, in lexical order.
    pub candidates: Vec<String>,
    pub techniques: Vec<Technique>,
}

/// A fully rewritten sentence ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSentence {
    pub mode: Mode,
    pub pairs: Vec<TokenPair>,
    pub changes: Vec<Change>,
    /// Log-probability of the rewritten sentence.
    pub confidence: f64,
}

/// What the engine made of one sentence.
#[derive(Debug, Clone, PartialEq)]
pub enum SentenceOutcome {
    Emitted(NormalizedSentence),
    /// Clean mode could not resolve the out-of-vocabulary token at `index`.
    Abandoned { index: TokenIndex, token: String },
    /// Noisify mode found nothing worth corrupting.
    Unchanged,
}

impl SentenceOutcome {
    pub fn emitted(&self) -> Option<&NormalizedSentence> {
        match self {
            SentenceOutcome::Emitted(sentence) => Some(sentence),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_status() {
        assert_eq!(TokenPair::new("goin", "going").status, PairStatus::Changed);
        assert_eq!(TokenPair::new("to", "to").status.as_str(), "IV");
        assert_eq!(PairStatus::Changed.as_str(), "OOV");
    }

    #[test]
    fn test_corroboration() {
        let mut candidate = Candidate {
            text: "going".to_string(),
            provenance: BTreeSet::from([Technique::ClusterCommon]),
        };
        assert!(!candidate.is_corroborated());
        // The same technique twice does not count as corroboration.
        candidate.provenance.insert(Technique::ClusterCommon);
        assert!(!candidate.is_corroborated());
        candidate.provenance.insert(Technique::Embedding);
        assert!(candidate.is_corroborated());
    }

    #[test]
    fn test_technique_names() {
        assert_eq!(Technique::ClusterAbbreviation.to_string(), "cluster-abbreviation");
        assert_eq!(Technique::Shorten.name(), "shorten");
    }
}
