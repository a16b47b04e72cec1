use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

use ragcmp_core::chat::ChatMessage;
use ragcmp_core::trace::Trace;
use ragcmp_core::{Error, Result};

use super::{preview, Lifecycle, StrategyContext, StrategyOutput};
use crate::knowledge::KnowledgeSource;
use crate::prompts;
use crate::tools::{ManualSearchTool, ToolSet};

/// One tool decision: the model may call `search_manual` once, then answers
/// from the tool output in a second call.
pub struct ToolInvokingStrategy {
    ctx: StrategyContext,
    knowledge: KnowledgeSource,
    tools: Mutex<Lifecycle<ToolSet>>,
}

impl ToolInvokingStrategy {
    pub fn new(ctx: StrategyContext, knowledge: KnowledgeSource) -> Self {
        Self { ctx, knowledge, tools: Mutex::new(Lifecycle::Uninitialized) }
    }

    async fn toolset(&self) -> Result<Arc<ToolSet>> {
        let mut state = self.tools.lock().await;
        if let Lifecycle::Ready(tools) = &*state {
            return Ok(tools.clone());
        }
        let document = self.knowledge.load()?;
        let tools = Arc::new(ToolSet::new().with(ManualSearchTool::new(document)));
        *state = Lifecycle::Ready(tools.clone());
        Ok(tools)
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        let mut trace = Trace::new();
        let tools = self.toolset().await?;
        trace.push("initialize", "Initialize tool-calling model");
        self.ctx.pacing.delay(demo_mode, 0.5).await;

        let decision = self
            .ctx
            .llm
            .generate_with_tools(&[ChatMessage::user(query)], &tools.definitions())
            .await
            .map_err(Error::model)?;
        trace.push_with(
            "llm_tool_decision",
            "Model decides whether to use a tool",
            json!({ "has_tool_calls": decision.has_tool_calls(), "tool_call_count": decision.tool_calls.len() }),
        );
        self.ctx.pacing.delay(demo_mode, 1.0).await;

        let mut actual_prompt = None;
        let response = match decision.tool_calls.first() {
            None => {
                trace.push("direct_answer", "Model answered without a tool");
                decision.content
            }
            Some(call) if tools.find(&call.name).is_none() => {
                tracing::warn!(tool = %call.name, "model requested unknown tool");
                trace.push_with(
                    "tool_error",
                    format!("Unknown tool '{}'", call.name),
                    json!({ "tool_name": call.name, "available_tools": tools.names() }),
                );
                prompts::unknown_tool(&call.name)
            }
            Some(call) => {
                let ignored = decision.tool_calls.len() - 1;
                if ignored > 0 {
                    tracing::debug!(ignored, "only the first tool call is executed");
                }
                trace.push_with(
                    "tool_execution",
                    format!("Run tool '{}'", call.name),
                    json!({ "tool_name": call.name, "tool_args": call.arguments, "ignored_tool_calls": ignored }),
                );
                self.ctx.pacing.delay(demo_mode, 1.0).await;

                let result = tools.call(call).await?;
                trace.push_with(
                    "tool_result",
                    "Tool returned",
                    json!({ "tool_result": preview(&result, 200) }),
                );
                self.ctx.pacing.delay(demo_mode, 1.0).await;

                let prompt = prompts::tool_answer(query, &result);
                let answer = self
                    .ctx
                    .llm
                    .generate(&[ChatMessage::user(prompt.clone())])
                    .await
                    .map_err(Error::model)?;
                trace.push("final_answer", "Model answered from the tool result");
                actual_prompt = Some(prompt);
                answer
            }
        };

        trace.push("complete", "Done");
        Ok(StrategyOutput {
            response,
            intermediate_steps: trace.into_steps(),
            actual_prompt: actual_prompt.or_else(|| Some(query.to_string())),
            retrieval_stats: None,
        })
    }
}
