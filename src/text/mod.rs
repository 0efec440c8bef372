//! Turning raw corpus lines into tokens and writing the resulting pairs.

pub mod corpus;
pub mod tokenizer;
pub mod writer;
