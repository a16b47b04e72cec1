use std::path::{Path, PathBuf};
use std::sync::Arc;

use ragcmp_core::config::{resolve_with_base, KnowledgeSettings};
use ragcmp_core::types::Document;
use ragcmp_core::{Error, Result};

/// Where the document comes from. Loading is explicit; nothing is read at construction.
#[derive(Debug, Clone)]
pub enum KnowledgeSource {
    File(PathBuf),
    Inline(Arc<Document>),
}

impl KnowledgeSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        KnowledgeSource::File(path.into())
    }

    pub fn inline(doc: Document) -> Self {
        KnowledgeSource::Inline(Arc::new(doc))
    }

    pub fn from_settings(settings: &KnowledgeSettings, base: &Path) -> Self {
        KnowledgeSource::File(resolve_with_base(base, &settings.path))
    }

    pub fn describe(&self) -> String {
        match self {
            KnowledgeSource::File(p) => p.display().to_string(),
            KnowledgeSource::Inline(doc) => doc.source.clone(),
        }
    }

    pub fn load(&self) -> Result<Arc<Document>> {
        match self {
            KnowledgeSource::Inline(doc) => Ok(doc.clone()),
            KnowledgeSource::File(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::KnowledgeSource(format!("{}: {}", path.display(), e)))?;
                tracing::info!(path = %path.display(), chars = text.chars().count(), "knowledge loaded");
                Ok(Arc::new(Document::new(path.display().to_string(), text)))
            }
        }
    }

    /// Cheap existence check used before any model is contacted.
    pub fn check(&self) -> Result<()> {
        match self {
            KnowledgeSource::Inline(_) => Ok(()),
            KnowledgeSource::File(path) if path.is_file() => Ok(()),
            KnowledgeSource::File(path) => Err(Error::KnowledgeSource(format!("{} is not a readable file", path.display()))),
        }
    }
}
