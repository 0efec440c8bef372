//! Interfaces to the two external collaborators the engine consults, and the
//! concrete providers the command line tool ships with.

pub mod arpa;
pub mod neighbours;

pub use arpa::ArpaModel;
pub use neighbours::{NeighbourTable, NoNeighbours, VectorNeighbours};

/// A statistical language model used as the context-scoring oracle.
pub trait LanguageModel {
    /// Log10 probability of the whitespace-separated `text`.
    /// `bos`/`eos` mark that the text starts or ends the sentence.
    /// Must be deterministic for identical inputs.
    fn score(&self, text: &str, bos: bool, eos: bool) -> f64;
}

/// Nearest-neighbour lookup in a word embedding space.
pub trait NeighbourLookup {
    /// Most similar words first. Unknown words yield an empty list, never an error.
    fn find(&self, word: &str) -> Vec<String>;
}

impl<T: LanguageModel + ?Sized> LanguageModel for Box<T> {
    fn score(&self, text: &str, bos: bool, eos: bool) -> f64 {
        (**self).score(text, bos, eos)
    }
}

impl<T: NeighbourLookup + ?Sized> NeighbourLookup for Box<T> {
    fn find(&self, word: &str) -> Vec<String> {
        (**self).find(word)
    }
}
