use std::collections::VecDeque;

use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{Chunk, Document, SourceSpan};

type Range = (usize, usize);

/// Recursive separator splitter.
///
/// Tries separators from most to least structural. Each piece keeps its
/// separator at the start, so chunks are exact slices of the document and
/// whitespace survives. Sizes are counted in chars, spans are byte offsets.
#[derive(Debug, Clone)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap, separators })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap, settings.separators.clone())
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn chunk_overlap(&self) -> usize { self.chunk_overlap }

    pub fn split(&self, doc: &Document) -> Vec<Chunk> {
        let mut ranges = Vec::new();
        if !doc.text.is_empty() {
            self.split_range(&doc.text, (0, doc.text.len()), &self.separators, &mut ranges);
        }
        let chunks: Vec<Chunk> = ranges
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| Chunk {
                text: doc.text[start..end].to_string(),
                span: SourceSpan { source: doc.source.clone(), index, start, end },
            })
            .collect();
        tracing::debug!(source = %doc.source, chunks = chunks.len(), "split document");
        chunks
    }

    fn split_range(&self, text: &str, range: Range, separators: &[String], out: &mut Vec<Range>) {
        let slice = &text[range.0..range.1];
        let (separator, remaining) = match separators.iter().position(|s| s.is_empty() || slice.contains(s.as_str())) {
            Some(i) => (separators[i].as_str(), &separators[i + 1..]),
            None => (separators.last().map(String::as_str).unwrap_or(""), &separators[separators.len()..]),
        };
        let atomic = separators.is_empty();

        let mut good: Vec<Range> = Vec::new();
        for piece in split_keep_start(text, range, separator, atomic) {
            if char_len(text, piece) <= self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                self.merge(text, &good, out);
                good.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                self.split_range(text, piece, remaining, out);
            }
        }
        if !good.is_empty() {
            self.merge(text, &good, out);
        }
    }

    /// Packs adjacent pieces into windows of at most `chunk_size` chars,
    /// carrying up to `chunk_overlap` chars of trailing pieces into the next one.
    fn merge(&self, text: &str, pieces: &[Range], out: &mut Vec<Range>) {
        let mut current: VecDeque<(Range, usize)> = VecDeque::new();
        let mut total = 0usize;
        for &piece in pieces {
            let len = char_len(text, piece);
            if total + len > self.chunk_size && !current.is_empty() {
                out.push(window(&current));
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some((_, popped)) => total -= popped,
                        None => break,
                    }
                }
            }
            current.push_back((piece, len));
            total += len;
        }
        if !current.is_empty() {
            out.push(window(&current));
        }
    }
}

fn window(current: &VecDeque<(Range, usize)>) -> Range {
    match (current.front(), current.back()) {
        (Some(((start, _), _)), Some(((_, end), _))) => (*start, *end),
        _ => (0, 0),
    }
}

fn char_len(text: &str, (start, end): Range) -> usize {
    text[start..end].chars().count()
}

/// Cuts `range` before every occurrence of `separator` (except at offset 0);
/// the empty separator cuts between chars.
fn split_keep_start(text: &str, range: Range, separator: &str, atomic: bool) -> Vec<Range> {
    let slice = &text[range.0..range.1];
    let cuts: Vec<usize> = if atomic {
        Vec::new()
    } else if separator.is_empty() {
        slice.char_indices().map(|(i, _)| i).filter(|&i| i > 0).collect()
    } else {
        slice.match_indices(separator).map(|(i, _)| i).filter(|&i| i > 0).collect()
    };
    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        pieces.push((range.0 + start, range.0 + cut));
        start = cut;
    }
    pieces.push((range.0 + start, range.1));
    pieces
}
