use serde_json::json;
use tokio::sync::Mutex;

use ragcmp_core::chat::ChatMessage;
use ragcmp_core::trace::Trace;
use ragcmp_core::types::Document;
use ragcmp_core::{Error, Result};

use super::{Lifecycle, StrategyContext, StrategyOutput};
use crate::knowledge::KnowledgeSource;
use crate::prompts;

/// Whole document templated into the prompt.
pub struct StuffingStrategy {
    ctx: StrategyContext,
    knowledge: KnowledgeSource,
    document: Mutex<Lifecycle<Document>>,
}

impl StuffingStrategy {
    pub fn new(ctx: StrategyContext, knowledge: KnowledgeSource) -> Self {
        Self { ctx, knowledge, document: Mutex::new(Lifecycle::Uninitialized) }
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        let mut trace = Trace::new();
        trace.push("initialize", "Initialize context stuffing");
        self.ctx.pacing.delay(demo_mode, 0.5).await;

        let document = {
            let mut state = self.document.lock().await;
            match &*state {
                Lifecycle::Ready(doc) => doc.clone(),
                Lifecycle::Uninitialized => {
                    let doc = self.knowledge.load()?;
                    *state = Lifecycle::Ready(doc.clone());
                    doc
                }
            }
        };
        trace.push_with(
            "load_knowledge",
            "Load the full knowledge document",
            json!({ "content_length": document.text.chars().count() }),
        );
        self.ctx.pacing.delay(demo_mode, 1.0).await;

        let prompt = prompts::stuffing(&document.text, query);
        trace.push_with(
            "create_prompt",
            "Template the document and question into one prompt",
            json!({ "prompt_length": prompt.chars().count() }),
        );

        trace.push("llm_invoke", "Send the stuffed prompt to the model");
        let response = self
            .ctx
            .llm
            .generate(&[ChatMessage::user(prompt.clone())])
            .await
            .map_err(Error::model)?;

        trace.push("complete", "Done");
        Ok(StrategyOutput {
            response,
            intermediate_steps: trace.into_steps(),
            actual_prompt: Some(prompt),
            retrieval_stats: None,
        })
    }
}
