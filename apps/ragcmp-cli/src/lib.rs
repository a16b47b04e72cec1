//! Setup shared by the `ragcmp` and `ragcmp-retrieve` binaries.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ragcmp_core::config::{resolve_with_base, Config, Settings};
use ragcmp_engine::{Capabilities, ExecutionMode, KnowledgeSource, RunLog, RunRecord, StrategyFactory};

pub mod cli;

/// Installs the global subscriber. `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().with_target(false).with_writer(std::io::stderr)).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Loaded settings plus the directory relative paths resolve against.
pub struct AppContext {
    pub base: PathBuf,
    pub settings: Settings,
}

impl AppContext {
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config = Config::load_from(config_dir)?;
        Ok(Self { base: config_dir.to_path_buf(), settings: config.settings()? })
    }

    pub fn knowledge(&self, path: Option<&Path>) -> KnowledgeSource {
        match path {
            Some(p) => KnowledgeSource::file(p),
            None => KnowledgeSource::from_settings(&self.settings.knowledge, &self.base),
        }
    }

    pub fn run_log(&self) -> RunLog {
        RunLog::new(resolve_with_base(&self.base, &self.settings.logs.dir))
    }

    /// Loads only the backends the requested modes use.
    pub fn capabilities(&self, modes: &[ExecutionMode]) -> Result<Capabilities> {
        let mut caps = Capabilities::llm_only(ragcmp_llm::build_language_model(&self.settings.llm)?);
        if modes.iter().any(ExecutionMode::needs_embedder) {
            caps.embedder = Some(ragcmp_embed::get_default_embedder(&self.settings.models, &self.base)?);
        }
        if modes.contains(&ExecutionMode::RetrievalGrounded) && self.settings.rerank.enabled {
            caps.cross_encoder = ragcmp_embed::get_default_cross_encoder(&self.settings.models, &self.base)?;
        }
        Ok(caps)
    }

    pub fn factory(&self, modes: &[ExecutionMode], knowledge: Option<&Path>) -> Result<StrategyFactory> {
        let knowledge = modes
            .iter()
            .any(ExecutionMode::needs_knowledge)
            .then(|| self.knowledge(knowledge));
        Ok(StrategyFactory::new(self.capabilities(modes)?, knowledge, self.settings.clone()))
    }
}

/// Runs one mode end to end. Failures become error records rather than `Err`.
pub async fn run_mode(factory: &StrategyFactory, mode: ExecutionMode, query: &str, demo_mode: bool) -> RunRecord {
    let start = Instant::now();
    let result = match factory.create(mode) {
        Ok(strategy) => strategy.process(query, demo_mode).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(output) => {
            tracing::info!(%mode, steps = output.intermediate_steps.len(), "run finished");
            RunRecord::success(mode, query, &output, start.elapsed(), demo_mode)
        }
        Err(e) => {
            tracing::error!(%mode, error = %e, "run failed");
            RunRecord::failure(mode, query, &e, start.elapsed(), demo_mode)
        }
    }
}

/// Human-readable block for one record.
pub fn render_record(record: &RunRecord, show_steps: bool) -> String {
    let mut out = format!(
        "[{}] {:?} {:.2}s tokens={} (in {} / out {})\n",
        record.execution_mode,
        record.status,
        record.execution_time,
        record.total_tokens,
        record.input_tokens,
        record.output_tokens
    );
    match &record.error_message {
        Some(msg) => out.push_str(&format!("error: {msg}\n")),
        None => out.push_str(&format!("{}\n", record.response)),
    }
    if show_steps {
        for (i, step) in record.intermediate_steps.iter().enumerate() {
            out.push_str(&format!("  {:>2}. {:<24} {}\n", i + 1, step.step, step.description));
        }
    }
    out
}
