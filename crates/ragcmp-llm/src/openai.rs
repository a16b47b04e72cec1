//! Chat completions client for any OpenAI-compatible endpoint (OpenAI, Ollama,
//! vLLM, llama.cpp server). Endpoints differ only by base URL and API key.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use ragcmp_core::chat::{ChatMessage, ModelTurn, ToolCall, ToolDefinition};
use ragcmp_core::config::LlmSettings;
use ragcmp_core::traits::LanguageModel;

pub struct OpenAiCompatibleModel {
    name: String,
    base_url: String,
    model: String,
    /// Empty for endpoints without auth (local Ollama).
    api_key: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatibleModel {
    pub fn from_settings(settings: &LlmSettings) -> Result<Self> {
        let api_key = std::env::var(&settings.api_key_env).unwrap_or_default();
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = settings.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().context("building HTTP client")?;
        Ok(Self {
            name: format!("openai-compatible:{}", settings.model),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
        })
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let mut body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages.iter().map(message_to_wire).collect::<Vec<_>>(),
        });
        if let Some(max) = self.max_tokens {
            body["max_tokens"] = json!(max);
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.iter().map(tool_to_wire).collect());
        }
        body
    }

    async fn chat(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelTurn> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self.client.post(&url).json(&self.request_body(messages, tools));
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        tracing::debug!(%url, messages = messages.len(), tools = tools.len(), "chat request");

        let resp = req.send().await.with_context(|| format!("{} connection failed ({})", self.name, url))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("{} API error {}: {}", self.name, status, text));
        }
        let body: Value = resp.json().await.context("decoding chat response")?;
        parse_turn(&body)
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        Ok(self.chat(messages, &[]).await?.content)
    }

    async fn generate_with_tools(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelTurn> {
        self.chat(messages, tools).await
    }
}

pub fn message_to_wire(msg: &ChatMessage) -> Value {
    let mut v = json!({ "role": msg.role.as_str(), "content": msg.content });
    if !msg.tool_calls.is_empty() {
        v["tool_calls"] = Value::Array(
            msg.tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.name, "arguments": c.arguments.to_string() },
                    })
                })
                .collect(),
        );
    }
    if let Some(id) = &msg.tool_call_id {
        v["tool_call_id"] = json!(id);
    }
    v
}

fn tool_to_wire(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Reads `choices[0].message`. Tool-call arguments arrive as a JSON string.
pub fn parse_turn(body: &Value) -> Result<ModelTurn> {
    let message = body["choices"]
        .get(0)
        .map(|c| &c["message"])
        .ok_or_else(|| anyhow!("No choices in response"))?;
    let content = message["content"].as_str().unwrap_or_default().to_string();
    let tool_calls = message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(i, t)| {
                    let name = t["function"]["name"].as_str()?;
                    let raw = &t["function"]["arguments"];
                    let arguments = match raw {
                        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|e| {
                            tracing::warn!(tool = name, error = %e, "tool arguments are not valid JSON");
                            json!({})
                        }),
                        Value::Null => json!({}),
                        other => other.clone(),
                    };
                    let id = t["id"].as_str().map(String::from).unwrap_or_else(|| format!("call_{i}"));
                    Some(ToolCall::new(id, name, arguments))
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(ModelTurn { content, tool_calls })
}
