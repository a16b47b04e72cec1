//! Domain types shared by the retrieval stages.

use serde::{Deserialize, Serialize};

/// The knowledge source: one flat text document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// Where a chunk came from. `start`/`end` are byte offsets into the document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub source: String,
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

/// A contiguous slice of the document. Identity for deduplication is `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub span: SourceSpan,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Which retrieval path surfaced a candidate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vector,
    Keyword,
}

/// A chunk proposed for one query. `score` is set by the vector index
/// (cosine) or the reranker (cross-encoder score); higher is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalCandidate {
    pub chunk: Chunk,
    pub source: SourceKind,
    pub score: Option<f32>,
}

impl RetrievalCandidate {
    pub fn vector(chunk: Chunk, score: f32) -> Self {
        Self { chunk, source: SourceKind::Vector, score: Some(score) }
    }

    pub fn keyword(chunk: Chunk) -> Self {
        Self { chunk, source: SourceKind::Keyword, score: None }
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// Ordered queries for multi-query retrieval; element 0 is always the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedQuerySet {
    queries: Vec<String>,
}

impl ExpandedQuerySet {
    pub fn new(original: impl Into<String>) -> Self {
        Self { queries: vec![original.into()] }
    }

    pub fn push(&mut self, query: impl Into<String>) {
        self.queries.push(query.into());
    }

    pub fn original(&self) -> &str {
        &self.queries[0]
    }

    pub fn expansions(&self) -> &[String] {
        &self.queries[1..]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }
}
