use std::sync::Arc;

use ragcmp_core::config::RerankSettings;
use ragcmp_core::traits::CrossEncoder;
use ragcmp_core::types::RetrievalCandidate;
use ragcmp_core::{Error, Result};

/// Cross-encoder reranking over a bounded candidate pool.
#[derive(Clone)]
pub struct Reranker {
    encoder: Arc<dyn CrossEncoder>,
    max_candidates: usize,
    max_passage_chars: usize,
}

impl Reranker {
    pub fn new(encoder: Arc<dyn CrossEncoder>, max_candidates: usize, max_passage_chars: usize) -> Self {
        Self { encoder, max_candidates, max_passage_chars }
    }

    pub fn from_settings(encoder: Arc<dyn CrossEncoder>, settings: &RerankSettings) -> Self {
        Self::new(encoder, settings.max_candidates, settings.max_passage_chars)
    }

    pub fn model_id(&self) -> &str {
        self.encoder.model_id()
    }

    /// Scores the first `max_candidates` against `query` (passages cut to
    /// `max_passage_chars`), sorts by score descending keeping input order on
    /// ties, and returns the best `top_k` with `score` set.
    pub fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<RetrievalCandidate>,
        top_k: usize,
    ) -> Result<Vec<RetrievalCandidate>> {
        if candidates.is_empty() {
            return Ok(candidates);
        }
        candidates.truncate(self.max_candidates);
        let passages: Vec<String> = candidates
            .iter()
            .map(|c| c.chunk.text.chars().take(self.max_passage_chars).collect())
            .collect();
        let scores = self.encoder.score_batch(query, &passages).map_err(Error::reranker)?;
        if scores.len() != candidates.len() {
            return Err(Error::Reranker(format!(
                "expected {} scores, got {}",
                candidates.len(),
                scores.len()
            )));
        }

        let mut scored: Vec<(RetrievalCandidate, f32)> = candidates.into_iter().zip(scores).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        tracing::debug!(model = self.encoder.model_id(), kept = scored.len(), "reranked");
        Ok(scored
            .into_iter()
            .map(|(mut c, score)| {
                c.score = Some(score);
                c
            })
            .collect())
    }
}
