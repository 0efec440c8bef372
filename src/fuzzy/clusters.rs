// File: src/fuzzy/clusters.rs
use crate::error::{NormError, Result};
use crate::fuzzy::lexicon::Lexicon;
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Which side of the vocabulary a cluster index hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    InVocab,
    OutOfVocab,
}

impl Polarity {
    /// `force_inverse` flips the index to hand out the other side of the vocabulary.
    pub fn from_inverse(force_inverse: bool) -> Self {
        if force_inverse {
            Polarity::OutOfVocab
        } else {
            Polarity::InVocab
        }
    }
}

/// Groups tokens by a pre-computed distributional cluster path.
///
/// Every token known to the file maps to its path, but a path only offers the
/// tokens matching the index polarity. The most common admissible token of
/// each path is always one of that path's members.
pub struct ClusterIndex {
    polarity: Polarity,
    members: HashMap<String, BTreeSet<String>>,
    token_paths: HashMap<String, String>,
    most_common: HashMap<String, (String, u64)>,
}

impl ClusterIndex {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            members: HashMap::new(),
            token_paths: HashMap::new(),
            most_common: HashMap::new(),
        }
    }

    pub fn load(path: &Path, lexicon: &Lexicon, force_inverse: bool) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let index = Self::from_reader(reader, lexicon, force_inverse)?;
        info!(
            path = %path.display(),
            polarity = ?index.polarity,
            clusters = index.members.len(),
            tokens = index.token_paths.len(),
            "cluster paths loaded"
        );
        Ok(index)
    }

    /// Builds the index from `path \t token \t count` lines.
    /// Any line without exactly three fields, blank lines included, or with a
    /// non-numeric count is fatal.
    pub fn from_reader<R: BufRead>(reader: R, lexicon: &Lexicon, force_inverse: bool) -> Result<Self> {
        let mut index = Self::new(Polarity::from_inverse(force_inverse));
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let record = line.trim_end_matches(['\r', '\n']);
            let fields: Vec<&str> = record.split('\t').collect();
            let [cluster, token, count] = fields.as_slice() else {
                return Err(NormError::malformed_cluster(line_no + 1, record));
            };
            let count: u64 = count
                .trim()
                .parse()
                .map_err(|_| NormError::malformed_cluster(line_no + 1, record))?;
            let admissible = lexicon.contains_word(token) == (index.polarity == Polarity::InVocab);
            index.insert(cluster, token, count, admissible);
        }
        Ok(index)
    }

    fn insert(&mut self, cluster: &str, token: &str, count: u64, admissible: bool) {
        let members = self.members.entry(cluster.to_string()).or_default();
        if admissible {
            members.insert(token.to_string());
            let best = self
                .most_common
                .entry(cluster.to_string())
                .or_insert_with(|| (String::new(), 0));
            if count > best.1 {
                *best = (token.to_string(), count);
            }
        }
        self.token_paths.insert(token.to_string(), cluster.to_string());
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Admissible tokens sharing `token`'s cluster path; empty if the token is unknown.
    pub fn suggest(&self, token: &str) -> BTreeSet<String> {
        self.get_path(token)
            .and_then(|path| self.members.get(path))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_path(&self, token: &str) -> Option<&str> {
        self.token_paths.get(token).map(String::as_str)
    }

    /// Highest-count admissible token of `path`. Ties keep the first one read.
    pub fn most_common(&self, path: &str) -> Option<&str> {
        self.most_common
            .get(path)
            .map(|(token, _)| token.as_str())
            .filter(|token| !token.is_empty())
    }
}
