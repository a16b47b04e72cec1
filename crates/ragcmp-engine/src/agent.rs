use serde::Serialize;
use serde_json::Value;

use ragcmp_core::chat::{ChatMessage, ToolDefinition};
use ragcmp_core::traits::LanguageModel;
use ragcmp_core::{Error, Result};

use crate::tools::ToolSet;

/// One tool round-trip made by the agent.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub tool_args: Value,
    pub observation: String,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub answer: String,
    pub invocations: Vec<ToolInvocation>,
    pub iterations: usize,
}

/// Model <-> tool rounds until the model answers without requesting a tool.
pub struct AgentLoop {
    system_prompt: String,
    tools: ToolSet,
    definitions: Vec<ToolDefinition>,
    max_iterations: usize,
}

impl AgentLoop {
    pub fn new(system_prompt: impl Into<String>, tools: ToolSet, max_iterations: usize) -> Self {
        let definitions = tools.definitions();
        Self { system_prompt: system_prompt.into(), tools, definitions, max_iterations }
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Runs every call of a turn in order and feeds each observation back as a
    /// tool message. Unknown tool names get an observation listing the valid
    /// ones; bad arguments fail the run.
    pub async fn run(&self, llm: &dyn LanguageModel, query: &str) -> Result<AgentRun> {
        let mut messages = vec![ChatMessage::system(self.system_prompt.clone()), ChatMessage::user(query)];
        let mut invocations = Vec::new();

        for iteration in 1..=self.max_iterations {
            let turn = llm
                .generate_with_tools(&messages, &self.definitions)
                .await
                .map_err(Error::model)?;
            if !turn.has_tool_calls() {
                tracing::info!(iterations = iteration, tool_calls = invocations.len(), "agent finished");
                return Ok(AgentRun { answer: turn.content, invocations, iterations: iteration });
            }

            messages.push(ChatMessage::assistant_with_tools(turn.content.clone(), turn.tool_calls.clone()));
            for call in &turn.tool_calls {
                let observation = if self.tools.find(&call.name).is_some() {
                    self.tools.call(call).await?
                } else {
                    tracing::warn!(tool = %call.name, "model requested unknown tool");
                    format!(
                        "Unknown tool '{}'. Available tools: {}",
                        call.name,
                        self.tools.names().join(", ")
                    )
                };
                messages.push(ChatMessage::tool_result(call.id.clone(), observation.clone()));
                invocations.push(ToolInvocation {
                    tool_name: call.name.clone(),
                    tool_args: call.arguments.clone(),
                    observation,
                });
            }
        }
        Err(Error::AgentIterationLimit(self.max_iterations))
    }
}
