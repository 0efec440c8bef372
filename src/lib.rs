// src/lib.rs

pub mod config;
pub mod core;
pub mod error;
pub mod fuzzy;
pub mod oracle;
pub mod persistence;
pub mod text;

pub use crate::config::{EngineOptions, ResourcePaths};
pub use crate::core::engine::{NormalizationEngine, Resources};
pub use crate::core::types::SentenceOutcome;
pub use crate::error::{NormError, Result};
