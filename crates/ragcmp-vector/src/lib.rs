//! ragcmp-vector
//!
//! In-memory dense index over the chunks of one document. Built once, then
//! read-only; cosine similarity by exhaustive scan.
pub mod index;

pub use index::{cosine, VectorIndex};
