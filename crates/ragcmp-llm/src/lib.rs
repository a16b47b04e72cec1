use anyhow::{bail, Result};
use std::sync::Arc;

use ragcmp_core::config::LlmSettings;
use ragcmp_core::traits::LanguageModel;

pub mod openai;
pub mod scripted;

pub use openai::OpenAiCompatibleModel;
pub use scripted::ScriptedModel;

/// Model client named by `llm.provider`.
pub fn build_language_model(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>> {
    match settings.provider.as_str() {
        "openai_compatible" | "openai" | "ollama" => {
            tracing::info!(base_url = %settings.base_url, model = %settings.model, "using OpenAI-compatible model");
            Ok(Arc::new(OpenAiCompatibleModel::from_settings(settings)?))
        }
        "scripted" => {
            tracing::warn!("using scripted model; answers echo the prompt");
            Ok(Arc::new(ScriptedModel::new()))
        }
        other => bail!("unknown llm.provider '{other}'"),
    }
}
