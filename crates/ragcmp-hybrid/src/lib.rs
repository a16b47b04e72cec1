//! ragcmp-hybrid
//!
//! Retrieval stages layered over the vector index and keyword matcher:
//! hybrid merge, multi-query expansion, cross-encoder reranking and
//! long-context reordering.
use std::collections::HashSet;

use ragcmp_core::config::RetrievalSettings;
use ragcmp_core::types::{Chunk, ExpandedQuerySet, RetrievalCandidate};
use ragcmp_core::Result;
use ragcmp_text::KeywordMatcher;
use ragcmp_vector::VectorIndex;

pub mod expand;
pub mod rerank;
pub mod reorder;

pub use expand::QueryExpander;
pub use reorder::reorder;
pub use rerank::Reranker;

pub struct HybridRetriever {
    matcher: KeywordMatcher,
    vector_k: usize,
    hybrid: bool,
}

impl HybridRetriever {
    pub fn new(matcher: KeywordMatcher, vector_k: usize, hybrid: bool) -> Self {
        Self { matcher, vector_k, hybrid }
    }

    pub fn from_settings(settings: &RetrievalSettings) -> Result<Self> {
        let matcher = KeywordMatcher::new(settings.maintenance_terms.clone())?;
        Ok(Self::new(matcher, settings.vector_k, settings.hybrid))
    }

    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    /// Vector hits in rank order, then keyword hits not already present by
    /// exact text, truncated to `max_chunks`.
    pub fn retrieve(
        &self,
        query: &str,
        chunks: &[Chunk],
        index: &VectorIndex,
        max_chunks: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        self.retrieve_with_k(query, chunks, index, self.vector_k, max_chunks)
    }

    pub fn retrieve_with_k(
        &self,
        query: &str,
        chunks: &[Chunk],
        index: &VectorIndex,
        vector_k: usize,
        max_chunks: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        if chunks.is_empty() || query.trim().is_empty() || max_chunks == 0 {
            return Ok(Vec::new());
        }
        let vector_hits = index.query(query, vector_k.max(1))?;
        let n_vector = vector_hits.len();
        let keyword_hits = self
            .matcher
            .find(query, chunks)
            .into_iter()
            .map(|m| RetrievalCandidate::keyword(m.chunk.clone()));

        let mut seen = HashSet::new();
        let merged = merge_unique(&mut seen, vector_hits.into_iter().chain(keyword_hits), max_chunks);
        tracing::debug!(vector = n_vector, merged = merged.len(), "hybrid retrieval");
        Ok(merged)
    }

    /// Plain vector hits; used when keyword matching is disabled.
    pub fn vector_only(&self, query: &str, index: &VectorIndex, k: usize) -> Result<Vec<RetrievalCandidate>> {
        if index.is_empty() || query.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        index.query(query, k)
    }

    /// Runs every query of the set (hybrid or vector-only per configuration)
    /// and merges the results, first seen wins, up to `limit` candidates.
    pub fn retrieve_all(
        &self,
        queries: &ExpandedQuerySet,
        chunks: &[Chunk],
        index: &VectorIndex,
        vector_k: usize,
        limit: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        let mut seen = HashSet::new();
        let mut merged = Vec::new();
        for query in queries.iter() {
            if merged.len() >= limit {
                break;
            }
            let hits = if self.hybrid {
                self.retrieve_with_k(query, chunks, index, vector_k, limit)?
            } else {
                self.vector_only(query, index, vector_k)?
            };
            let remaining = limit - merged.len();
            merged.extend(merge_unique(&mut seen, hits.into_iter(), remaining));
        }
        tracing::debug!(queries = queries.len(), candidates = merged.len(), "multi-query retrieval");
        Ok(merged)
    }
}

fn merge_unique(
    seen: &mut HashSet<String>,
    candidates: impl Iterator<Item = RetrievalCandidate>,
    limit: usize,
) -> Vec<RetrievalCandidate> {
    let mut out = Vec::new();
    for c in candidates {
        if out.len() >= limit {
            break;
        }
        if seen.insert(c.chunk.text.clone()) {
            out.push(c);
        }
    }
    out
}
