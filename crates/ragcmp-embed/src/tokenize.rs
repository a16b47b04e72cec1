use anyhow::Result;
use candle_core::{Device, Tensor};
use tokenizers::Encoding;

/// XLM-RoBERTa `<pad>` id.
pub const PAD_ID: u32 = 1;

/// Packs encodings into `[B,T]` id and mask tensors, truncated to `max_len`
/// and right-padded to the longest sequence in the batch.
pub fn pad_batch(encodings: &[Encoding], max_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
    let width = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);
    let mut ids = Vec::with_capacity(encodings.len() * width);
    let mut mask = Vec::with_capacity(encodings.len() * width);
    for enc in encodings {
        let take = enc.get_ids().len().min(width);
        ids.extend_from_slice(&enc.get_ids()[..take]);
        mask.extend_from_slice(&enc.get_attention_mask()[..take]);
        ids.extend(std::iter::repeat(PAD_ID).take(width - take));
        mask.extend(std::iter::repeat(0u32).take(width - take));
    }
    let input_ids = Tensor::from_vec(ids, (encodings.len(), width), device)?;
    let attention_mask = Tensor::from_vec(mask, (encodings.len(), width), device)?;
    Ok((input_ids, attention_mask))
}
