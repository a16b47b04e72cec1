//! ragcmp-text
//!
//! Exact-match keyword retrieval over chunks. Complements the vector index for
//! identifiers (error codes) and domain vocabulary that embeddings blur.
pub mod matcher;

pub use matcher::{KeywordMatch, KeywordMatcher, KeywordRule};
