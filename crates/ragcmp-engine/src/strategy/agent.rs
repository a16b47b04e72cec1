use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use ragcmp_core::chunker::Chunker;
use ragcmp_core::trace::Trace;
use ragcmp_core::traits::Embedder;
use ragcmp_core::{Error, Result};
use ragcmp_vector::VectorIndex;

use super::{preview, Lifecycle, StrategyContext, StrategyOutput};
use crate::agent::AgentLoop;
use crate::knowledge::KnowledgeSource;
use crate::prompts;
use crate::tools::{KnowledgeSearchTool, SerialNumberTool, ToolSet};

/// Tool-calling agent with semantic search over the manual and a serial-number lookup.
pub struct AgentStrategy {
    ctx: StrategyContext,
    knowledge: KnowledgeSource,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    state: Mutex<Lifecycle<AgentLoop>>,
}

impl AgentStrategy {
    pub fn new(ctx: StrategyContext, knowledge: KnowledgeSource, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let agent = &ctx.settings.agent;
        if agent.search_k == 0 || agent.max_iterations == 0 {
            return Err(Error::InvalidConfig("agent.search_k and agent.max_iterations must be positive".into()));
        }
        let chunker = Chunker::new(agent.chunk_size, agent.chunk_overlap, agent.separators.clone())?;
        Ok(Self { ctx, knowledge, embedder, chunker, state: Mutex::new(Lifecycle::Uninitialized) })
    }

    async fn agent(&self, trace: &mut Trace, demo_mode: bool) -> Result<Arc<AgentLoop>> {
        let mut state = self.state.lock().await;
        if let Lifecycle::Ready(agent) = &*state {
            trace.push("agent_cached", "Reuse the agent built earlier");
            return Ok(agent.clone());
        }

        let settings = &self.ctx.settings;
        let document = self.knowledge.load()?;
        let chunks = self.chunker.split(&document);
        let chunk_count = chunks.len();
        let index = VectorIndex::build(self.embedder.clone(), chunks, settings.models.embed_batch_size)?;
        trace.push_with(
            "setup_rag",
            format!("Indexed {chunk_count} chunks for knowledge search"),
            json!({ "chunk_count": chunk_count }),
        );
        self.ctx.pacing.delay(demo_mode, 2.0).await;

        let tools = ToolSet::new()
            .with(KnowledgeSearchTool::new(Arc::new(index), settings.agent.search_k))
            .with(SerialNumberTool::new(settings.agent.serial_number.clone()));
        let agent = Arc::new(AgentLoop::new(
            prompts::agent_system(&settings.agent.product_name),
            tools,
            settings.agent.max_iterations,
        ));
        trace.push_with(
            "setup_agent",
            "Create the tool-calling agent",
            json!({ "tool_count": agent.tool_count() }),
        );
        *state = Lifecycle::Ready(agent.clone());
        Ok(agent)
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        let mut trace = Trace::new();
        trace.push("initialize", "Initialize retrieval agent");
        let agent = self.agent(&mut trace, demo_mode).await?;
        self.ctx.pacing.delay(demo_mode, 0.5).await;

        trace.push("agent_execution", "Agent selects and runs tools on its own");
        self.ctx.pacing.delay(demo_mode, 1.5).await;
        let run = agent.run(self.ctx.llm.as_ref(), query).await?;
        for inv in &run.invocations {
            trace.push_with(
                "agent_tool_call",
                format!("Agent called '{}'", inv.tool_name),
                json!({
                    "tool_name": inv.tool_name,
                    "tool_args": inv.tool_args,
                    "observation": preview(&inv.observation, 200),
                }),
            );
        }

        trace.push_with("complete", "Done", json!({ "iterations": run.iterations }));
        Ok(StrategyOutput {
            response: run.answer,
            intermediate_steps: trace.into_steps(),
            actual_prompt: Some(query.to_string()),
            retrieval_stats: None,
        })
    }
}
