use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{
    Config as XLMRobertaConfig, XLMRobertaForSequenceClassification, XLMRobertaModel,
};
use tokenizers::{Tokenizer, TruncationParams};

use ragcmp_core::traits::{CrossEncoder, Embedder};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::pad_batch;

/// Files shared by both model kinds: `tokenizer.json`, `config.json` and
/// `model.safetensors` or `pytorch_model.bin`.
struct ModelFiles {
    tokenizer: Tokenizer,
    config: XLMRobertaConfig,
    weights: HashMap<String, Tensor>,
}

fn load_files(dir: &Path, device: &Device) -> Result<ModelFiles> {
    let tokenizer_path = dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

    let config_path = dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config: XLMRobertaConfig = serde_json::from_str(&raw)?;

    let safetensors = dir.join("model.safetensors");
    let weights = if safetensors.exists() {
        candle_core::safetensors::load(&safetensors, device)?
    } else {
        let bin = dir.join("pytorch_model.bin");
        candle_core::pickle::read_all(&bin)
            .with_context(|| format!("reading {}", bin.display()))?
            .into_iter()
            .collect()
    };
    Ok(ModelFiles { tokenizer, config, weights })
}

fn model_id(dir: &Path) -> String {
    dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| dir.display().to_string())
}

/// BGE-M3 dense embedder: XLM-RoBERTa encoder with masked mean pooling.
pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
    dim: usize,
    max_len: usize,
}

impl EmbeddingModel {
    pub fn load(dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %dir.display(), "loading embedding model");
        let files = load_files(dir, &device)?;
        let dim = files.config.hidden_size;
        let vb = VarBuilder::from_tensors(files.weights, DType::F32, &device);
        let model = XLMRobertaModel::new(&files.config, vb)?;
        tracing::info!(dim, "embedding model ready");
        Ok(Self { model, tokenizer: files.tokenizer, device, id: model_id(dir), dim, max_len: 256 })
    }
}

impl Embedder for EmbeddingModel {
    fn model_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let (input_ids, attention_mask) = pad_batch(&encodings, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        tracing::debug!(batch = texts.len(), ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

/// bge-reranker style cross-encoder: one relevance logit per `(query, passage)` pair.
pub struct CrossEncoderModel {
    model: XLMRobertaForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    id: String,
}

impl CrossEncoderModel {
    pub fn load(dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!(dir = %dir.display(), "loading cross-encoder");
        let mut files = load_files(dir, &device)?;
        files
            .tokenizer
            .with_truncation(Some(TruncationParams { max_length: 512, ..Default::default() }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        let vb = VarBuilder::from_tensors(files.weights, DType::F32, &device);
        let model = XLMRobertaForSequenceClassification::new(1, &files.config, vb)?;
        Ok(Self { model, tokenizer: files.tokenizer, device, id: model_id(dir) })
    }
}

impl CrossEncoder for CrossEncoderModel {
    fn model_id(&self) -> &str { &self.id }

    fn score_batch(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }
        let pairs: Vec<(&str, &str)> = passages.iter().map(|p| (query, p.as_str())).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let (input_ids, attention_mask) = pad_batch(&encodings, 512, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let logits = self.model.forward(&input_ids, &attention_mask, &token_type_ids)?;
        let scores: Vec<f32> = logits.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.flatten_all()?.to_vec1()?;
        Ok(scores)
    }
}

/// First existing directory named by `overrides` (env var names), else the configured path.
pub fn resolve_model_dir(configured: &Path, overrides: &[&str]) -> Result<PathBuf> {
    for &var in overrides {
        if let Ok(dir) = std::env::var(var) {
            let p = PathBuf::from(&dir);
            if p.exists() {
                tracing::info!(var, dir = %p.display(), "model dir from env");
                return Ok(p);
            }
        }
    }
    if configured.exists() {
        return Ok(configured.to_path_buf());
    }
    Err(anyhow!("Could not locate model directory {}", configured.display()))
}
