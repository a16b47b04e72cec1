use ragcmp_core::chat::ChatMessage;
use ragcmp_core::trace::Trace;
use ragcmp_core::{Error, Result};

use super::{StrategyContext, StrategyOutput};

/// The question alone, no grounding.
pub struct DirectStrategy {
    ctx: StrategyContext,
}

impl DirectStrategy {
    pub fn new(ctx: StrategyContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, query: &str, demo_mode: bool) -> Result<StrategyOutput> {
        let mut trace = Trace::new();
        trace.push("initialize", "Initialize language model");
        self.ctx.pacing.delay(demo_mode, 1.0).await;

        trace.push("llm_invoke", "Send the query directly to the model");
        let response = self
            .ctx
            .llm
            .generate(&[ChatMessage::user(query)])
            .await
            .map_err(Error::model)?;
        self.ctx.pacing.delay(demo_mode, 0.5).await;

        trace.push("complete", "Done");
        Ok(StrategyOutput {
            response,
            intermediate_steps: trace.into_steps(),
            actual_prompt: Some(query.to_string()),
            retrieval_stats: None,
        })
    }
}
