//! In-memory model that replays queued turns. Deterministic stand-in for
//! tests and offline demos.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ragcmp_core::chat::{ChatMessage, ChatRole, ModelTurn, ToolCall, ToolDefinition};
use ragcmp_core::traits::LanguageModel;

enum Reply {
    Turn(ModelTurn),
    Fail(String),
}

pub struct ScriptedModel {
    name: String,
    turns: Mutex<VecDeque<Reply>>,
    /// When set, every tool-enabled call requests this tool.
    always_call: Option<ToolCall>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    call_count: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::with_name("scripted")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            turns: Mutex::new(VecDeque::new()),
            always_call: None,
            seen: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// A model that answers every tool-enabled call with `call` (and `content`
    /// as raw text), and plain calls from the queue or by echo.
    pub fn always_calling(call: ToolCall) -> Self {
        Self { always_call: Some(call), ..Self::with_name("scripted-tool") }
    }

    pub fn push_text(&self, content: impl Into<String>) -> &Self {
        self.push(ModelTurn::text(content))
    }

    pub fn push_tool_call(&self, call: ToolCall) -> &Self {
        self.push(ModelTurn { content: String::new(), tool_calls: vec![call] })
    }

    pub fn push(&self, turn: ModelTurn) -> &Self {
        self.enqueue(Reply::Turn(turn))
    }

    /// The next call fails with `message`, like a transport or backend error.
    pub fn push_error(&self, message: impl Into<String>) -> &Self {
        self.enqueue(Reply::Fail(message.into()))
    }

    fn enqueue(&self, reply: Reply) -> &Self {
        self.turns.lock().unwrap_or_else(|e| e.into_inner()).push_back(reply);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Message lists received so far, one entry per call.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_exhausted(&self) -> bool {
        self.turns.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    fn record(&self, messages: &[ChatMessage]) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).push(messages.to_vec());
    }

    fn next_turn(&self, messages: &[ChatMessage]) -> Result<ModelTurn> {
        let next = self.turns.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(Reply::Turn(turn)) => Ok(turn),
            Some(Reply::Fail(message)) => Err(anyhow!(message)),
            None => Ok(ModelTurn::text(echo(messages))),
        }
    }
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Fallback reply when nothing is queued.
fn echo(messages: &[ChatMessage]) -> String {
    let last = messages
        .iter()
        .rev()
        .find(|m| matches!(m.role, ChatRole::User | ChatRole::Tool))
        .map(|m| m.content.as_str())
        .unwrap_or_default();
    format!("[scripted] {last}")
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        self.record(messages);
        Ok(self.next_turn(messages)?.content)
    }

    async fn generate_with_tools(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Result<ModelTurn> {
        self.record(messages);
        if let Some(call) = &self.always_call {
            if !tools.is_empty() {
                return Ok(ModelTurn { content: "[scripted] tool request".to_string(), tool_calls: vec![call.clone()] });
            }
        }
        self.next_turn(messages)
    }
}
