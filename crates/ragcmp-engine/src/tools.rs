use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use ragcmp_core::chat::{ToolCall, ToolDefinition};
use ragcmp_core::types::Document;
use ragcmp_core::{Error, Result};
use ragcmp_vector::VectorIndex;

use crate::prompts;

/// A function exposed to the model. Tools own whatever state they need.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn execute(&self, args: &Value) -> anyhow::Result<String>;
}

#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Every name in the schema's `required` list must be present and non-null.
    pub fn validate_args(def: &ToolDefinition, args: &Value) -> Result<()> {
        for key in def.required_args() {
            if args.get(key).map_or(true, Value::is_null) {
                return Err(Error::Tool(format!("{}: missing required argument '{}'", def.name, key)));
            }
        }
        Ok(())
    }

    /// Validates and runs `call`. Unknown names are an error here; callers
    /// that want a softer answer check [`ToolSet::find`] first.
    pub async fn call(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .find(&call.name)
            .ok_or_else(|| Error::Tool(format!("unknown tool '{}'", call.name)))?;
        Self::validate_args(&tool.definition(), &call.arguments)?;
        tracing::debug!(tool = %call.name, args = %call.arguments, "tool call");
        tool.execute(&call.arguments).await.map_err(Error::tool)
    }
}

fn query_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": { "query": { "type": "string", "description": description } },
        "required": ["query"],
    })
}

fn query_arg(args: &Value) -> anyhow::Result<&str> {
    args.get("query")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("'query' must be a string"))
}

/// Case-insensitive substring search over the document's lines.
pub struct ManualSearchTool {
    document: Arc<Document>,
}

impl ManualSearchTool {
    pub const NAME: &'static str = "search_manual";

    pub fn new(document: Arc<Document>) -> Self {
        Self { document }
    }

    pub fn search(&self, query: &str) -> String {
        let needle = query.to_lowercase();
        let lines: Vec<&str> = self
            .document
            .text
            .lines()
            .filter(|line| line.to_lowercase().contains(&needle))
            .map(str::trim)
            .collect();
        if lines.is_empty() {
            prompts::not_found(query)
        } else {
            lines.join("\n")
        }
    }
}

#[async_trait]
impl Tool for ManualSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "製品取扱説明書内でテキスト検索を行います。キーワードを含む行を返します。",
            query_schema("検索したいキーワードや文字列"),
        )
    }

    async fn execute(&self, args: &Value) -> anyhow::Result<String> {
        Ok(self.search(query_arg(args)?))
    }
}

/// Semantic search over the vector index; top `k` chunks joined by blank lines.
pub struct KnowledgeSearchTool {
    index: Arc<VectorIndex>,
    k: usize,
}

impl KnowledgeSearchTool {
    pub const NAME: &'static str = "search_knowledge_base";

    pub fn new(index: Arc<VectorIndex>, k: usize) -> Self {
        Self { index, k }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "製品取扱説明書のナレッジベースを意味検索で検索します。",
            query_schema("検索したい内容を表すクエリ"),
        )
    }

    async fn execute(&self, args: &Value) -> anyhow::Result<String> {
        let query = query_arg(args)?;
        if self.index.is_empty() || query.trim().is_empty() {
            return Ok(prompts::not_found(query));
        }
        let hits = self.index.query(query, self.k)?;
        if hits.is_empty() {
            return Ok(prompts::not_found(query));
        }
        let joined = hits.iter().map(|h| h.text()).collect::<Vec<_>>().join("\n\n");
        Ok(prompts::search_results(&joined))
    }
}

pub struct SerialNumberTool {
    serial: String,
}

impl SerialNumberTool {
    pub const NAME: &'static str = "get_robot_serial_number";

    pub fn new(serial: impl Into<String>) -> Self {
        Self { serial: serial.into() }
    }
}

#[async_trait]
impl Tool for SerialNumberTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            Self::NAME,
            "ロボットのシリアル番号を取得します。",
            json!({ "type": "object", "properties": {} }),
        )
    }

    async fn execute(&self, _args: &Value) -> anyhow::Result<String> {
        Ok(self.serial.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual() -> Arc<Document> {
        Arc::new(Document::new("m", "## エラー\n  E-404: センサー未検出  \nW-12: 低電圧\n"))
    }

    #[tokio::test]
    async fn manual_search_is_case_insensitive_and_trims_lines() {
        let tool = ManualSearchTool::new(manual());
        let out = tool.execute(&json!({"query": "e-404"})).await.unwrap();
        assert_eq!(out, "E-404: センサー未検出");
    }

    #[tokio::test]
    async fn manual_search_reports_no_match() {
        let tool = ManualSearchTool::new(manual());
        let out = tool.execute(&json!({"query": "X-1"})).await.unwrap();
        assert_eq!(out, "'X-1'に関する情報は見つかりませんでした。");
    }

    #[tokio::test]
    async fn missing_required_argument_is_a_tool_error() {
        let set = ToolSet::new().with(ManualSearchTool::new(manual()));
        let err = set.call(&ToolCall::new("c", ManualSearchTool::NAME, json!({}))).await.unwrap_err();
        assert!(matches!(err, Error::Tool(_)));
    }

    #[tokio::test]
    async fn serial_tool_needs_no_arguments() {
        let set = ToolSet::new().with(SerialNumberTool::new("AW3-2024-001255"));
        let out = set.call(&ToolCall::new("c", SerialNumberTool::NAME, json!({}))).await.unwrap();
        assert_eq!(out, "AW3-2024-001255");
        assert_eq!(set.names(), vec![SerialNumberTool::NAME]);
    }
}
