//! Configuration loader and path helpers.
//!
//! Figment merges built-in defaults, `config.toml`, `config.<env>.toml` and
//! `APP_*` env vars (`__` separates nested keys, e.g. `APP_LLM__MODEL`).
//! [`Settings`] is the typed view consumed by the pipeline crates.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load `config.toml` and `config.<env>.toml` from `dir`, then `APP_*` variables.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view over every section, with defaults for anything not configured.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        if settings.chunking.chunk_size == 0 {
            anyhow::bail!("chunking.chunk_size must be positive");
        }
        if settings.chunking.chunk_overlap >= settings.chunking.chunk_size {
            anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
        }
        if matches!(env, "prod" | "production") && settings.models.use_fake {
            anyhow::bail!("models.use_fake is not allowed in production");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub knowledge: KnowledgeSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub expansion: ExpansionSettings,
    pub rerank: RerankSettings,
    pub reorder: ReorderSettings,
    pub agent: AgentSettings,
    pub llm: LlmSettings,
    pub models: ModelSettings,
    pub demo: DemoSettings,
    pub logs: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    pub path: String,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self { path: "data/knowledge.txt".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 150,
            separators: ["## ", "\n\n", "\n", "。", "、", " ", ""].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Merge keyword matches into vector hits.
    pub hybrid: bool,
    pub vector_k: usize,
    pub max_chunks: usize,
    pub maintenance_terms: Vec<String>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            hybrid: true,
            vector_k: 5,
            max_chunks: 5,
            maintenance_terms: ["メンテナンス", "定期", "保守", "点検", "交換", "清掃"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionSettings {
    pub enabled: bool,
    pub max_expansions: usize,
}

impl Default for ExpansionSettings {
    fn default() -> Self {
        Self { enabled: true, max_expansions: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub enabled: bool,
    /// Vector hits requested per query when building the rerank pool.
    pub candidate_k: usize,
    pub max_candidates: usize,
    pub max_passage_chars: usize,
    pub top_k: usize,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { enabled: true, candidate_k: 12, max_candidates: 20, max_passage_chars: 800, top_k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderSettings {
    pub enabled: bool,
}

impl Default for ReorderSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub product_name: String,
    pub serial_number: String,
    pub search_k: usize,
    pub max_iterations: usize,
    /// The agent's knowledge search indexes finer chunks than the retrieval pipeline.
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// No heading separator: agent chunks split on paragraphs first.
    pub separators: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            product_name: "Auto-Welder V3".to_string(),
            serial_number: "AW3-2024-001255".to_string(),
            search_k: 3,
            max_iterations: 15,
            chunk_size: 500,
            chunk_overlap: 50,
            separators: ["\n\n", "\n", "。", "、", " ", ""].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// `openai_compatible` or `scripted`.
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai_compatible".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            model: "llama3.1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub embedding_dir: String,
    pub reranker_dir: Option<String>,
    /// Hashing embedder and lexical scorer instead of the local models.
    pub use_fake: bool,
    pub embed_batch_size: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self { embedding_dir: "models/bge-m3".to_string(), reranker_dir: None, use_fake: false, embed_batch_size: 32 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoSettings {
    pub pacing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { dir: "logs".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
