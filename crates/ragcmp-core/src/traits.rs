use async_trait::async_trait;

use crate::chat::{ChatMessage, ModelTurn, ToolDefinition};

pub trait Embedder: Send + Sync {
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Scores `(query, passage)` pairs; higher means more relevant.
pub trait CrossEncoder: Send + Sync {
    fn model_id(&self) -> &str;
    fn score_batch(&self, query: &str, passages: &[String]) -> anyhow::Result<Vec<f32>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    async fn generate_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> anyhow::Result<ModelTurn>;
}
