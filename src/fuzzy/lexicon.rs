// --- File: src/fuzzy/lexicon.rs
use crate::error::Result;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Marks the start and end of every stored word, so that a word which is a
/// prefix or suffix of another still has its own terminal edge.
pub const WORD_DELIMITER: char = '\u{0}';

type NodeId = usize;

const ROOT: NodeId = 0;

#[derive(Clone, Default)]
struct LexiconNode {
    children: HashMap<char, NodeId>,
}

/// A known-word set stored as an arena of trie nodes.
/// Immutable once loading is done; all lookups take `&self`.
#[derive(Clone)]
pub struct Lexicon {
    nodes: Vec<LexiconNode>,
    ignore_case: bool,
    len: usize,
}

/// One pending branch of the fuzzy search.
struct SearchState {
    cursor: usize,
    prefix: String,
    node: NodeId,
    edits: usize,
}

impl Lexicon {
    pub fn new(ignore_case: bool) -> Self {
        Self {
            nodes: vec![LexiconNode::default()],
            ignore_case,
            len: 0,
        }
    }

    pub fn from_words<I, S>(words: I, ignore_case: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lexicon = Self::new(ignore_case);
        for word in words {
            lexicon.add_word(word.as_ref());
        }
        lexicon
    }

    /// Loads a newline-delimited vocabulary file. Blank lines are ignored.
    pub fn load(path: &Path, ignore_case: bool) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut lexicon = Self::new(ignore_case);
        for line in reader.lines() {
            let line = line?;
            let word = line.trim_end();
            if !word.is_empty() {
                lexicon.add_word(word);
            }
        }
        info!(path = %path.display(), words = lexicon.len(), "vocabulary loaded");
        Ok(lexicon)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn fold(&self, word: &str) -> String {
        if self.ignore_case {
            word.to_lowercase()
        } else {
            word.to_string()
        }
    }

    fn child(&self, node: NodeId, letter: char) -> Option<NodeId> {
        self.nodes[node].children.get(&letter).copied()
    }

    /// Inserts a word. Adding a word that is already present is a no-op.
    /// O(k) complexity where k is word length.
    pub fn add_word(&mut self, word: &str) {
        if self.contains_word(word) {
            return;
        }
        let word = self.fold(word);
        let mut node_idx = ROOT;
        let letters = std::iter::once(WORD_DELIMITER)
            .chain(word.chars())
            .chain(std::iter::once(WORD_DELIMITER));
        for letter in letters {
            node_idx = match self.child(node_idx, letter) {
                Some(next_idx) => next_idx,
                None => {
                    let new_node_id = self.nodes.len();
                    self.nodes.push(LexiconNode::default());
                    self.nodes[node_idx].children.insert(letter, new_node_id);
                    new_node_id
                }
            };
        }
        self.len += 1;
    }

    /// Exact membership, O(k) in the word length.
    pub fn contains_word(&self, word: &str) -> bool {
        let word = self.fold(word);
        let letters = std::iter::once(WORD_DELIMITER)
            .chain(word.chars())
            .chain(std::iter::once(WORD_DELIMITER));
        let mut node_idx = ROOT;
        for letter in letters {
            match self.child(node_idx, letter) {
                Some(next_idx) => node_idx = next_idx,
                None => return false,
            }
        }
        true
    }

    /// Returns every stored word within `max_edits` insertions, deletions or
    /// substitutions of `word`, by walking the trie with an explicit work list.
    ///
    /// The search is exponential in `max_edits`, which is expected to be 1 or 2.
    /// A wider budget always yields a superset of a narrower one.
    pub fn suggest(&self, word: &str, max_edits: usize) -> BTreeSet<String> {
        let mut results = BTreeSet::new();
        let Some(start) = self.child(ROOT, WORD_DELIMITER) else {
            return results;
        };
        let input: Vec<char> = self
            .fold(word)
            .chars()
            .chain(std::iter::once(WORD_DELIMITER))
            .collect();

        let mut work = vec![SearchState {
            cursor: 0,
            prefix: String::new(),
            node: start,
            edits: 0,
        }];
        while let Some(state) = work.pop() {
            if state.cursor == input.len() {
                continue;
            }
            let next_letter = input[state.cursor];
            let budget_left = state.edits < max_edits;
            for (&letter, &child) in &self.nodes[state.node].children {
                if letter == next_letter {
                    if letter == WORD_DELIMITER {
                        results.insert(state.prefix.clone());
                    } else {
                        work.push(SearchState {
                            cursor: state.cursor + 1,
                            prefix: extend(&state.prefix, letter),
                            node: child,
                            edits: state.edits,
                        });
                    }
                } else if budget_left && letter != WORD_DELIMITER {
                    // Insertion: take the edge without consuming input.
                    work.push(SearchState {
                        cursor: state.cursor,
                        prefix: extend(&state.prefix, letter),
                        node: child,
                        edits: state.edits + 1,
                    });
                    // Substitution: take the edge in place of the input letter.
                    work.push(SearchState {
                        cursor: state.cursor + 1,
                        prefix: extend(&state.prefix, letter),
                        node: child,
                        edits: state.edits + 1,
                    });
                }
            }
            if budget_left {
                // Deletion: drop one input letter and stay on this node.
                work.push(SearchState {
                    cursor: state.cursor + 1,
                    prefix: state.prefix,
                    node: state.node,
                    edits: state.edits + 1,
                });
            }
        }
        results
    }
}

fn extend(prefix: &str, letter: char) -> String {
    let mut next = String::with_capacity(prefix.len() + letter.len_utf8());
    next.push_str(prefix);
    next.push(letter);
    next
}
