use regex::Regex;

use ragcmp_core::chat::ChatMessage;
use ragcmp_core::traits::LanguageModel;
use ragcmp_core::types::ExpandedQuerySet;
use ragcmp_core::{Error, Result};

/// Asks the model for alternate phrasings of a query.
pub struct QueryExpander {
    max_expansions: usize,
    numbered: Regex,
}

impl QueryExpander {
    pub fn new(max_expansions: usize) -> Result<Self> {
        let numbered = Regex::new(r"^\d+\.\s*(.+)").map_err(|e| Error::InvalidConfig(e.to_string()))?;
        Ok(Self { max_expansions, numbered })
    }

    pub fn max_expansions(&self) -> usize {
        self.max_expansions
    }

    pub fn prompt(&self, query: &str) -> String {
        let mut prompt = format!(
            "元の質問: {query}\n\n上記を異なる表現で書き換えた{}つの検索クエリを生成してください:",
            self.max_expansions
        );
        for i in 1..=self.max_expansions {
            prompt.push_str(&format!("\n{i}. [クエリ{i}]"));
        }
        prompt
    }

    /// `<n>. <text>` lines of the reply, in order, at most `max_expansions`.
    /// Anything else is ignored.
    pub fn parse(&self, reply: &str) -> Vec<String> {
        reply
            .lines()
            .filter_map(|line| self.numbered.captures(line.trim()))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
            .filter(|q| !q.is_empty())
            .take(self.max_expansions)
            .collect()
    }

    /// `[query]` plus the parsed phrasings. With no expansions configured the
    /// model is not called.
    pub async fn expand(&self, query: &str, model: &dyn LanguageModel) -> Result<ExpandedQuerySet> {
        let mut set = ExpandedQuerySet::new(query);
        if self.max_expansions == 0 {
            return Ok(set);
        }
        let reply = model
            .generate(&[ChatMessage::user(self.prompt(query))])
            .await
            .map_err(Error::model)?;
        let parsed = self.parse(&reply);
        if parsed.is_empty() {
            tracing::warn!("query expansion produced no usable lines");
        }
        for q in parsed {
            set.push(q);
        }
        Ok(set)
    }
}
