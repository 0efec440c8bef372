// File: src/oracle/neighbours.rs
use crate::error::{NormError, Result};
use crate::oracle::NeighbourLookup;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// How many neighbours are kept per word.
pub const NEIGHBOUR_COUNT: usize = 40;

/// A lookup that never finds anything. Used when no embeddings are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNeighbours;

impl NeighbourLookup for NoNeighbours {
    fn find(&self, _word: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Precomputed neighbour lists, most similar first.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourTable {
    neighbours: HashMap<String, Vec<String>>,
}

impl NeighbourTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str, neighbours: Vec<String>) {
        self.neighbours.insert(word.to_string(), neighbours);
    }

    pub fn len(&self) -> usize {
        self.neighbours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbours.is_empty()
    }

    /// Reads `word<TAB>n1,n2,...` lines.
    pub fn load_text(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let table = Self::from_reader(reader)?;
        info!(path = %path.display(), words = table.len(), "neighbour table loaded");
        Ok(table)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table = Self::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (word, list) = line.split_once('\t').ok_or_else(|| {
                NormError::embedding(format!("line {}: expected word<TAB>neighbours", line_no + 1))
            })?;
            let neighbours = list
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect();
            table.insert(word, neighbours);
        }
        Ok(table)
    }
}

impl NeighbourLookup for NeighbourTable {
    fn find(&self, word: &str) -> Vec<String> {
        self.neighbours.get(word).cloned().unwrap_or_default()
    }
}

/// Word vectors searched by brute-force cosine similarity.
pub struct VectorNeighbours {
    words: Vec<String>,
    index: HashMap<String, usize>,
    /// Unit-length vectors, one per word.
    vectors: Vec<Vec<f32>>,
    top_k: usize,
}

impl VectorNeighbours {
    /// Reads word2vec text format: an optional `count dim` header, then
    /// `word v1 v2 ...` per line.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let vectors = Self::from_reader(reader)?;
        info!(path = %path.display(), words = vectors.words.len(), "word vectors loaded");
        Ok(vectors)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut words = Vec::new();
        let mut index = HashMap::new();
        let mut vectors = Vec::new();
        let mut dimension = None;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(word) = fields.next() else {
                continue;
            };
            let values: Vec<&str> = fields.collect();
            if line_no == 0 && values.len() == 1 && word.parse::<usize>().is_ok() && values[0].parse::<usize>().is_ok() {
                continue;
            }
            let vector = values
                .iter()
                .map(|v| v.parse::<f32>())
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| NormError::embedding(format!("line {}: {e}", line_no + 1)))?;
            let expected = *dimension.get_or_insert(vector.len());
            if vector.is_empty() || vector.len() != expected {
                return Err(NormError::embedding(format!(
                    "line {}: expected {expected} dimensions, found {}",
                    line_no + 1,
                    vector.len()
                )));
            }
            index.insert(word.to_string(), words.len());
            words.push(word.to_string());
            vectors.push(normalized(vector));
        }
        Ok(Self {
            words,
            index,
            vectors,
            top_k: NEIGHBOUR_COUNT,
        })
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Computes every word's neighbours, for caching.
    pub fn to_table(&self) -> NeighbourTable {
        let mut table = NeighbourTable::new();
        for word in &self.words {
            table.insert(word, self.find(word));
        }
        table
    }
}

impl NeighbourLookup for VectorNeighbours {
    fn find(&self, word: &str) -> Vec<String> {
        let Some(&id) = self.index.get(word) else {
            return Vec::new();
        };
        let query = &self.vectors[id];
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != id)
            .map(|(other, vector)| (other, dot(query, vector)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(other, _)| self.words[other].clone())
            .collect()
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalized(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = dot(&vector, &vector).sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}
