use std::sync::Arc;
use std::time::Instant;

use ragcmp_core::traits::Embedder;
use ragcmp_core::types::{Chunk, RetrievalCandidate};
use ragcmp_core::{Error, Result};

struct Entry {
    vector: Vec<f32>,
    norm: f32,
    chunk: Chunk,
}

/// `(vector, chunk)` pairs in chunk order. Exists only once every chunk is embedded.
pub struct VectorIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<Entry>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.embedder.model_id())
            .field("len", &self.entries.len())
            .finish()
    }
}

impl VectorIndex {
    pub fn build(embedder: Arc<dyn Embedder>, chunks: Vec<Chunk>, batch_size: usize) -> Result<Self> {
        Self::build_with_progress(embedder, chunks, batch_size, |_, _| {})
    }

    /// Embeds chunks in batches of `batch_size`, calling `on_progress(done, total)` after each batch.
    pub fn build_with_progress<F>(
        embedder: Arc<dyn Embedder>,
        chunks: Vec<Chunk>,
        batch_size: usize,
        mut on_progress: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, usize),
    {
        let start = Instant::now();
        let total = chunks.len();
        let batch_size = batch_size.max(1);
        let mut vectors = Vec::with_capacity(total);
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embedded = embedder.embed_batch(&texts).map_err(Error::embedding)?;
            if embedded.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            for v in &embedded {
                check_dim(embedder.as_ref(), v)?;
            }
            vectors.extend(embedded);
            on_progress(vectors.len(), total);
        }

        let entries = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| Entry { norm: l2(&vector), vector, chunk })
            .collect();
        tracing::info!(
            chunks = total,
            model = embedder.model_id(),
            ms = start.elapsed().as_millis() as u64,
            "vector index built"
        );
        Ok(Self { embedder, entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// The `k` chunks most similar to `text`, best first; equal scores keep chunk order.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<RetrievalCandidate>> {
        if k == 0 {
            return Err(Error::InvalidConfig("k must be positive".into()));
        }
        let mut embedded = self.embedder.embed_batch(&[text.to_string()]).map_err(Error::embedding)?;
        let query_vec = embedded
            .pop()
            .ok_or_else(|| Error::Embedding("embedder returned no vector for query".into()))?;
        check_dim(self.embedder.as_ref(), &query_vec)?;
        let query_norm = l2(&query_vec);

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_with_norms(&query_vec, query_norm, &e.vector, e.norm)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        tracing::debug!(k, hits = scored.len(), "vector query");

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievalCandidate::vector(self.entries[i].chunk.clone(), score))
            .collect())
    }
}

fn check_dim(embedder: &dyn Embedder, v: &[f32]) -> Result<()> {
    if v.len() != embedder.dim() {
        return Err(Error::Embedding(format!(
            "dimension mismatch: expected {}, got {}",
            embedder.dim(),
            v.len()
        )));
    }
    Ok(())
}

fn l2(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn cosine_with_norms(a: &[f32], na: f32, b: &[f32], nb: f32) -> f32 {
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (na * nb)
}

/// Cosine similarity; zero when either vector is zero.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norms(a, l2(a), b, l2(b))
}
