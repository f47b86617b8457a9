use anyhow::{anyhow, bail, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Encoding, Tokenizer};

/// A padded `[B,T]` batch ready for a BERT forward pass.
pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

pub fn pad_id(tokenizer: &Tokenizer) -> u32 {
    tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0)
}

/// Encode single texts or `(query, text)` pairs and pad to the longest row.
pub fn encode_batch<'s, E>(tokenizer: &Tokenizer, inputs: Vec<E>, max_len: usize, pad_id: u32, device: &Device) -> Result<EncodedBatch>
where
    E: Into<EncodeInput<'s>> + Send,
{
    let encodings = tokenizer.encode_batch(inputs, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    to_tensors(&encodings, max_len, pad_id, device)
}

fn to_tensors(encodings: &[Encoding], max_len: usize, pad_id: u32, device: &Device) -> Result<EncodedBatch> {
    if encodings.is_empty() { bail!("cannot build an empty batch"); }
    if max_len < 2 { bail!("max_len must be at least 2"); }
    let rows: Vec<(Vec<u32>, Vec<u32>, Vec<u32>)> = encodings.iter().map(|enc| {
        let mut ids = enc.get_ids().to_vec();
        let mut types = enc.get_type_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > max_len {
            // keep the closing special token
            let (last_id, last_type) = (ids[ids.len() - 1], types[types.len() - 1]);
            ids.truncate(max_len - 1); types.truncate(max_len - 1); mask.truncate(max_len - 1);
            ids.push(last_id); types.push(last_type); mask.push(1);
        }
        (ids, types, mask)
    }).collect();
    let seq_len = rows.iter().map(|r| r.0.len()).max().unwrap_or(0);
    let batch = rows.len();
    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut types = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    for (row_ids, row_types, row_mask) in rows {
        let pad = seq_len - row_ids.len();
        ids.extend(row_ids); ids.extend(std::iter::repeat(pad_id).take(pad));
        types.extend(row_types); types.extend(std::iter::repeat(0).take(pad));
        mask.extend(row_mask); mask.extend(std::iter::repeat(0).take(pad));
    }
    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, (batch, seq_len), device)?,
        token_type_ids: Tensor::from_vec(types, (batch, seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq_len), device)?,
    })
}
