// src/fuzzy/mod.rs

pub mod clusters;
pub mod lexicon;
pub mod scorer;
