use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown execution mode: {0}")]
    UnknownMode(String),

    #[error("Knowledge source unavailable: {0}")]
    KnowledgeSource(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Language model call failed: {0}")]
    Model(String),

    #[error("Reranking failed: {0}")]
    Reranker(String),

    #[error("Tool failed: {0}")]
    Tool(String),

    #[error("Agent stopped after {0} iterations without a final answer")]
    AgentIterationLimit(usize),
}

impl Error {
    /// True for errors raised before any model was contacted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::UnknownMode(_) | Error::KnowledgeSource(_))
    }

    pub fn embedding(e: anyhow::Error) -> Self {
        Error::Embedding(format!("{e:#}"))
    }

    pub fn model(e: anyhow::Error) -> Self {
        Error::Model(format!("{e:#}"))
    }

    pub fn reranker(e: anyhow::Error) -> Self {
        Error::Reranker(format!("{e:#}"))
    }

    pub fn tool(e: anyhow::Error) -> Self {
        Error::Tool(format!("{e:#}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
