//! The five execution strategies behind one `process` contract.
//!
//! Each variant appends [`TraceStep`]s as it goes and returns them with the
//! answer. Strategies that need an index or agent build it on first use,
//! at most once, behind an async mutex.

use serde::Serialize;
use std::sync::Arc;

use ragcmp_core::config::Settings;
use ragcmp_core::trace::TraceStep;
use ragcmp_core::traits::LanguageModel;
use ragcmp_core::Result;

use crate::mode::ExecutionMode;
use crate::pacing::Pacing;

mod agent;
mod direct;
mod retrieval;
mod stuffing;
mod tool_invoking;

pub use agent::AgentStrategy;
pub use direct::DirectStrategy;
pub use retrieval::RetrievalStrategy;
pub use stuffing::StuffingStrategy;
pub use tool_invoking::ToolInvokingStrategy;

#[derive(Debug, Clone, Serialize)]
pub struct StrategyOutput {
    pub response: String,
    pub intermediate_steps: Vec<TraceStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval_stats: Option<RetrievalStats>,
}

/// What the retrieval pipeline did for one query.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalStats {
    pub original_query: String,
    pub expanded_queries: Vec<String>,
    pub initial_candidates: usize,
    pub final_chunks: usize,
    pub hybrid_applied: bool,
    pub query_expansion_applied: bool,
    pub reranking_applied: bool,
    pub context_reordering_applied: bool,
}

/// Collaborators every strategy shares.
#[derive(Clone)]
pub struct StrategyContext {
    pub llm: Arc<dyn LanguageModel>,
    pub settings: Arc<Settings>,
    pub pacing: Pacing,
}

/// Lazily built per-strategy state.
pub(crate) enum Lifecycle<T> {
    Uninitialized,
    Ready(Arc<T>),
}

pub enum Strategy {
    Direct(DirectStrategy),
    ContextStuffing(StuffingStrategy),
    RetrievalGrounded(RetrievalStrategy),
    ToolInvoking(ToolInvokingStrategy),
    RetrievalAgent(AgentStrategy),
}

impl Strategy {
    pub fn mode(&self) -> ExecutionMode {
        match self {
            Strategy::Direct(_) => ExecutionMode::Direct,
            Strategy::ContextStuffing(_) => ExecutionMode::ContextStuffing,
            Strategy::RetrievalGrounded(_) => ExecutionMode::RetrievalGrounded,
            Strategy::ToolInvoking(_) => ExecutionMode::ToolInvoking,
            Strategy::RetrievalAgent(_) => ExecutionMode::RetrievalAgent,
        }
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        tracing::info!(mode = %self.mode(), demo_mode, "processing query");
        match self {
            Strategy::Direct(s) => s.process(query, demo_mode).await,
            Strategy::ContextStuffing(s) => s.process(query, demo_mode).await,
            Strategy::RetrievalGrounded(s) => s.process(query, demo_mode).await,
            Strategy::ToolInvoking(s) => s.process(query, demo_mode).await,
            Strategy::RetrievalAgent(s) => s.process(query, demo_mode).await,
        }
    }
}

pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
