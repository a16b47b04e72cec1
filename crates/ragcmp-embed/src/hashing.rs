//! Deterministic stand-ins for the neural models. No weights, no I/O; used for
//! offline runs (`models.use_fake`) and tests.

use anyhow::Result;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ragcmp_core::traits::{CrossEncoder, Embedder};

/// Feature-hashing embedder over whitespace tokens and char bigrams, L2-normalized.
/// Bigrams give unsegmented Japanese text a usable signal.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered.split_whitespace() {
            self.add_feature(&mut v, token, 1.0);
        }
        for gram in char_bigrams(&lowered) {
            self.add_feature(&mut v, &gram, 0.5);
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for x in &mut v { *x /= norm; }
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], feature: &str, weight: f32) {
        let mut hasher = XxHash64::with_seed(0);
        feature.hash(&mut hasher);
        let h = hasher.finish();
        let idx = (h % self.dim as u64) as usize;
        let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
        v[idx] += sign * weight;
    }
}

impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str { "hashing" }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Lexical cross-encoder: share of the query's char bigrams found in the passage.
#[derive(Default)]
pub struct OverlapScorer;

impl OverlapScorer {
    pub fn new() -> Self { Self }

    pub fn score(&self, query: &str, passage: &str) -> f32 {
        let q: HashSet<String> = char_bigrams(&query.to_lowercase()).into_iter().collect();
        if q.is_empty() {
            return 0.0;
        }
        let p: HashSet<String> = char_bigrams(&passage.to_lowercase()).into_iter().collect();
        q.intersection(&p).count() as f32 / q.len() as f32
    }
}

impl CrossEncoder for OverlapScorer {
    fn model_id(&self) -> &str { "lexical-overlap" }

    fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        Ok(passages.iter().map(|p| self.score(query, p)).collect())
    }
}

fn char_bigrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if chars.len() == 1 {
        return vec![chars[0].to_string()];
    }
    chars.windows(2).map(|w| w.iter().collect()).collect()
}
