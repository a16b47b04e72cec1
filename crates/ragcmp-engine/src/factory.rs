use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ragcmp_core::config::Settings;
use ragcmp_core::traits::{CrossEncoder, Embedder, LanguageModel};
use ragcmp_core::{Error, Result};

use crate::knowledge::KnowledgeSource;
use crate::mode::ExecutionMode;
use crate::pacing::{Pacer, Pacing, TokioSleepPacer};
use crate::strategy::{
    AgentStrategy, DirectStrategy, RetrievalStrategy, Strategy, StrategyContext, StuffingStrategy,
    ToolInvokingStrategy,
};

/// Model backends handed to strategies. Only the language model is mandatory;
/// retrieval modes also need an embedder, reranking needs a cross-encoder.
#[derive(Clone)]
pub struct Capabilities {
    pub llm: Arc<dyn LanguageModel>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub cross_encoder: Option<Arc<dyn CrossEncoder>>,
}

impl Capabilities {
    pub fn llm_only(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm, embedder: None, cross_encoder: None }
    }
}

/// Creates one strategy per mode for a knowledge source and hands out the
/// same instance on later requests.
pub struct StrategyFactory {
    capabilities: Capabilities,
    knowledge: Option<KnowledgeSource>,
    settings: Arc<Settings>,
    pacing: Pacing,
    cache: Mutex<HashMap<ExecutionMode, Arc<Strategy>>>,
}

impl StrategyFactory {
    pub fn new(capabilities: Capabilities, knowledge: Option<KnowledgeSource>, settings: Settings) -> Self {
        let pacing = Pacing::new(Arc::new(TokioSleepPacer), settings.demo.pacing);
        Self {
            capabilities,
            knowledge,
            settings: Arc::new(settings),
            pacing,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the delay implementation; the `demo.pacing` switch still applies.
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacing = Pacing::new(pacer, self.settings.demo.pacing);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn create_named(&self, name: &str) -> Result<Arc<Strategy>> {
        self.create(name.parse()?)
    }

    pub fn create(&self, mode: ExecutionMode) -> Result<Arc<Strategy>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = cache.get(&mode) {
            return Ok(existing.clone());
        }
        let strategy = Arc::new(self.build(mode)?);
        tracing::info!(%mode, "strategy created");
        cache.insert(mode, strategy.clone());
        Ok(strategy)
    }

    fn build(&self, mode: ExecutionMode) -> Result<Strategy> {
        let ctx = StrategyContext {
            llm: self.capabilities.llm.clone(),
            settings: self.settings.clone(),
            pacing: self.pacing.clone(),
        };
        if mode == ExecutionMode::Direct {
            return Ok(Strategy::Direct(DirectStrategy::new(ctx)));
        }

        let knowledge = self
            .knowledge
            .clone()
            .ok_or_else(|| Error::InvalidConfig(format!("mode '{mode}' needs a knowledge source")))?;
        knowledge.check()?;

        let embedder = || {
            self.capabilities
                .embedder
                .clone()
                .ok_or_else(|| Error::InvalidConfig(format!("mode '{mode}' needs an embedder")))
        };

        Ok(match mode {
            ExecutionMode::Direct => Strategy::Direct(DirectStrategy::new(ctx)),
            ExecutionMode::ContextStuffing => Strategy::ContextStuffing(StuffingStrategy::new(ctx, knowledge)),
            ExecutionMode::RetrievalGrounded => Strategy::RetrievalGrounded(RetrievalStrategy::new(
                ctx,
                knowledge,
                embedder()?,
                self.capabilities.cross_encoder.clone(),
            )?),
            ExecutionMode::ToolInvoking => Strategy::ToolInvoking(ToolInvokingStrategy::new(ctx, knowledge)),
            ExecutionMode::RetrievalAgent => {
                Strategy::RetrievalAgent(AgentStrategy::new(ctx, knowledge, embedder()?)?)
            }
        })
    }
}
