use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::info;

/// Everything read from a sentence-transformers style model directory.
pub struct LoadedBert {
    pub model: BertModel,
    pub tokenizer: Tokenizer,
    pub hidden_size: usize,
    pub vb: VarBuilder<'static>,
}

pub fn load_bert(model_dir: &Path, device: &Device) -> Result<LoadedBert> {
    if !model_dir.exists() {
        return Err(anyhow!("model directory {} does not exist", model_dir.display()));
    }
    info!(dir = %model_dir.display(), "loading tokenizer");
    let tokenizer_path = model_dir.join("tokenizer.json");
    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

    let config_path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: BertConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    let hidden_size = serde_json::from_str::<serde_json::Value>(&raw)?
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

    let vb = load_weights(model_dir, device)?;
    let model = BertModel::load(vb.clone(), &config)?;
    info!(hidden_size, "model loaded");
    Ok(LoadedBert { model, tokenizer, hidden_size, vb })
}

/// Prefer `model.safetensors`; fall back to a pickled `pytorch_model.bin`.
fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DTYPE, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    if weights_path.exists() {
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        return Ok(VarBuilder::from_tensors(weights_map, DTYPE, device));
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin under {}", model_dir.display()))
}
