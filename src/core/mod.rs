// src/core/mod.rs

pub mod classifier;
pub mod context;
pub mod engine;
pub mod provenance;
pub mod types;
