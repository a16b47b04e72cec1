use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ragcmp_core::Error;

/// The five grounding strategies, from none to a tool-calling agent over retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Direct,
    ContextStuffing,
    RetrievalGrounded,
    ToolInvoking,
    RetrievalAgent,
}

impl ExecutionMode {
    pub const ALL: [ExecutionMode; 5] = [
        ExecutionMode::Direct,
        ExecutionMode::ContextStuffing,
        ExecutionMode::RetrievalGrounded,
        ExecutionMode::ToolInvoking,
        ExecutionMode::RetrievalAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Direct => "direct",
            ExecutionMode::ContextStuffing => "context_stuffing",
            ExecutionMode::RetrievalGrounded => "retrieval_grounded",
            ExecutionMode::ToolInvoking => "tool_invoking",
            ExecutionMode::RetrievalAgent => "retrieval_agent",
        }
    }

    /// Name used by earlier log files and clients.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            ExecutionMode::Direct => "llm_only",
            ExecutionMode::ContextStuffing => "prompt_stuffing",
            ExecutionMode::RetrievalGrounded => "rag_only",
            ExecutionMode::ToolInvoking => "function_calling",
            ExecutionMode::RetrievalAgent => "rag_function_calling",
        }
    }

    pub fn needs_knowledge(&self) -> bool {
        !matches!(self, ExecutionMode::Direct)
    }

    pub fn needs_embedder(&self) -> bool {
        matches!(self, ExecutionMode::RetrievalGrounded | ExecutionMode::RetrievalAgent)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase().replace('-', "_");
        ExecutionMode::ALL
            .into_iter()
            .find(|m| m.as_str() == name || m.legacy_name() == name)
            .ok_or_else(|| Error::UnknownMode(s.to_string()))
    }
}
