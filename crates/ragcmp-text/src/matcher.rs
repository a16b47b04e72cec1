use regex::Regex;
use serde::Serialize;

use ragcmp_core::types::Chunk;
use ragcmp_core::{Error, Result};

const CODE_PATTERN: &str = r"[A-Za-z]-[0-9]+";

/// Which rule selected a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordRule {
    /// Identifier such as `E-404` appears verbatim.
    ErrorCode,
    /// Query and chunk both mention the maintenance vocabulary.
    Category,
    /// A longer query word appears verbatim.
    GeneralTerm,
}

#[derive(Debug, Clone, Copy)]
pub struct KeywordMatch<'a> {
    pub chunk: &'a Chunk,
    pub rule: KeywordRule,
}

pub struct KeywordMatcher {
    code_pattern: Regex,
    vocabulary: Vec<String>,
    min_term_chars: usize,
}

impl KeywordMatcher {
    pub fn new(vocabulary: Vec<String>) -> Result<Self> {
        let code_pattern = Regex::new(CODE_PATTERN).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self { code_pattern, vocabulary, min_term_chars: 3 })
    }

    /// Codes like `E-404` mentioned in the query, in order of appearance.
    pub fn extract_codes<'q>(&self, query: &'q str) -> Vec<&'q str> {
        self.code_pattern.find_iter(query).map(|m| m.as_str()).collect()
    }

    pub fn general_terms<'q>(&self, query: &'q str) -> Vec<&'q str> {
        query.split_whitespace().filter(|w| w.chars().count() >= self.min_term_chars).collect()
    }

    /// Applies the code, category and general-term rules in that order.
    /// Each rule walks chunks in document order; a chunk hit by several rules
    /// appears once per rule.
    pub fn find<'a>(&self, query: &str, chunks: &'a [Chunk]) -> Vec<KeywordMatch<'a>> {
        let mut matches = Vec::new();

        let codes = self.extract_codes(query);
        if !codes.is_empty() {
            for chunk in chunks {
                if codes.iter().any(|code| chunk.text.contains(code)) {
                    matches.push(KeywordMatch { chunk, rule: KeywordRule::ErrorCode });
                }
            }
        }

        if self.vocabulary.iter().any(|term| query.contains(term.as_str())) {
            for chunk in chunks {
                if self.vocabulary.iter().any(|term| chunk.text.contains(term.as_str())) {
                    matches.push(KeywordMatch { chunk, rule: KeywordRule::Category });
                }
            }
        }

        let terms = self.general_terms(query);
        if !terms.is_empty() {
            for chunk in chunks {
                if terms.iter().any(|t| chunk.text.contains(t)) {
                    matches.push(KeywordMatch { chunk, rule: KeywordRule::GeneralTerm });
                }
            }
        }

        tracing::debug!(codes = codes.len(), terms = terms.len(), matches = matches.len(), "keyword match");
        matches
    }
}
