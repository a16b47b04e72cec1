use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use ragcmp_core::config::{resolve_with_base, ModelSettings};
use ragcmp_core::traits::{CrossEncoder, Embedder};

pub mod device;
pub mod hashing;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hashing::{HashingEmbedder, OverlapScorer};
pub use model::{resolve_model_dir, CrossEncoderModel, EmbeddingModel};
pub use pool::masked_mean_l2;

pub const FAKE_DIM: usize = 1024;

/// Embedder selected by configuration: the hashing stand-in when
/// `models.use_fake` is set, otherwise the local BGE-M3 model.
pub fn get_default_embedder(settings: &ModelSettings, base: &Path) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake {
        tracing::info!("using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(FAKE_DIM)));
    }
    let configured = resolve_with_base(base, &settings.embedding_dir);
    let dir = resolve_model_dir(&configured, &["APP_MODEL_DIR", "MODEL_DIR"])?;
    Ok(Arc::new(EmbeddingModel::load(&dir)?))
}

/// Cross-encoder selected by configuration; `None` when no reranker is configured.
pub fn get_default_cross_encoder(settings: &ModelSettings, base: &Path) -> Result<Option<Arc<dyn CrossEncoder>>> {
    if settings.use_fake {
        tracing::info!("using lexical overlap scorer");
        return Ok(Some(Arc::new(OverlapScorer::new())));
    }
    match &settings.reranker_dir {
        Some(dir) => {
            let dir = resolve_model_dir(&resolve_with_base(base, dir), &[])?;
            Ok(Some(Arc::new(CrossEncoderModel::load(&dir)?)))
        }
        None => {
            tracing::warn!("no reranker configured; reranking will be skipped");
            Ok(None)
        }
    }
}
