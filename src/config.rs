//! Engine options and the locations of the resources the engine is built from.

use crate::core::engine::Resources;
use crate::error::{NormError, Result};
use crate::fuzzy::clusters::ClusterIndex;
use crate::fuzzy::lexicon::Lexicon;
use crate::oracle::{ArpaModel, NeighbourLookup, NeighbourTable, NoNeighbours, VectorNeighbours};
use crate::persistence::load_neighbour_cache;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Tunable behaviour of the normalization engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Treat tokens that split into two known words as compounds: they are
    /// skipped during classification and split candidates are only proposed
    /// when noisifying. Otherwise split candidates are proposed when cleaning.
    pub allow_compounds: bool,
    /// Fold case in the lexicon.
    pub ignore_case: bool,
    /// Abbreviation matches must score strictly above this.
    pub abbreviation_threshold: f64,
    /// Multiplier on the original token's log-probability when noisifying.
    pub noisify_baseline_factor: f64,
    /// Ratio used instead of zero when a typo candidate equals the token.
    pub exact_match_bonus: f64,
    /// Widest typo search; a single edit is always tried first.
    pub max_typo_edits: usize,
    /// Tokens must be longer than this for repeated letters to be collapsed.
    pub min_shorten_length: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            allow_compounds: false,
            ignore_case: true,
            abbreviation_threshold: 0.7,
            noisify_baseline_factor: 2.0,
            exact_match_bonus: 5.0,
            max_typo_edits: 2,
            min_shorten_length: 3,
        }
    }
}

impl EngineOptions {
    /// Reads options from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let options: EngineOptions = serde_json::from_reader(reader)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.abbreviation_threshold) {
            return Err(NormError::config(format!(
                "abbreviation_threshold must be within [0, 1], got {}",
                self.abbreviation_threshold
            )));
        }
        if self.exact_match_bonus <= 0.0 {
            return Err(NormError::config("exact_match_bonus must be positive"));
        }
        if self.max_typo_edits == 0 {
            return Err(NormError::config("max_typo_edits must be at least 1"));
        }
        Ok(())
    }
}

/// Where the neighbour lookup comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighbourSource {
    None,
    /// `word<TAB>n1,n2,...` text table.
    Table(PathBuf),
    /// Bincode cache written by `build-cache`.
    Cache(PathBuf),
    /// word2vec text vectors, searched on demand.
    Vectors(PathBuf),
}

/// Files needed to build the engine.
#[derive(Debug, Clone)]
pub struct ResourcePaths {
    pub vocabulary: PathBuf,
    pub cluster_paths: PathBuf,
    pub language_model: PathBuf,
    pub neighbours: NeighbourSource,
}

impl ResourcePaths {
    /// Loads every resource once; any missing or malformed file is fatal.
    pub fn load(&self, options: &EngineOptions) -> Result<Resources> {
        let lexicon = Lexicon::load(&self.vocabulary, options.ignore_case)?;
        let clusters = ClusterIndex::load(&self.cluster_paths, &lexicon, false)?;
        let noisy_clusters = ClusterIndex::load(&self.cluster_paths, &lexicon, true)?;
        let model = ArpaModel::load(&self.language_model)?;
        let neighbours: Box<dyn NeighbourLookup> = match &self.neighbours {
            NeighbourSource::None => {
                info!("no embeddings configured, embedding technique disabled");
                Box::new(NoNeighbours)
            }
            NeighbourSource::Table(path) => Box::new(NeighbourTable::load_text(path)?),
            NeighbourSource::Cache(path) => Box::new(load_neighbour_cache(path)?),
            NeighbourSource::Vectors(path) => Box::new(VectorNeighbours::load(path)?),
        };
        Ok(Resources {
            lexicon,
            clusters,
            noisy_clusters,
            model: Box::new(model),
            neighbours,
        })
    }
}
