//! Cross-encoder rerankers: `(query, text)` pairs scored jointly.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use candle_core::{Device, IndexOp};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::BertModel;
use helpmate_core::config::{expand_path, RerankBackend, RerankerSettings};
use helpmate_core::traits::CrossEncoder;
use tokenizers::Tokenizer;
use tracing::info;

use crate::{device, model, tokenize};

const PAIR_BATCH: usize = 16;

/// `BertForSequenceClassification` with one label (ms-marco style).
/// Scores are sigmoid(logit), so ordering matches the raw logits.
pub struct BertCrossEncoder { bert: BertModel, pooler: Linear, classifier: Linear, tokenizer: Tokenizer, device: Device, max_len: usize, pad_id: u32 }

impl BertCrossEncoder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        let loaded = model::load_bert(model_dir, &device)?;
        let hidden = loaded.hidden_size;
        let pooler = candle_nn::linear(hidden, hidden, loaded.vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden, 1, loaded.vb.pp("classifier"))?;
        let pad_id = tokenize::pad_id(&loaded.tokenizer);
        Ok(Self { bert: loaded.model, pooler, classifier, tokenizer: loaded.tokenizer, device, max_len, pad_id })
    }

    fn score_chunk(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let pairs: Vec<(String, String)> = texts.iter().map(|t| (query.to_string(), t.clone())).collect();
        let enc = tokenize::encode_batch(&self.tokenizer, pairs, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.bert.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?.squeeze(1)?;
        let logits = logits.to_device(&Device::Cpu)?.to_vec1::<f32>()?;
        Ok(logits.into_iter().map(sigmoid).collect())
    }
}

impl CrossEncoder for BertCrossEncoder {
    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(PAIR_BATCH) { scores.extend(self.score_chunk(query, chunk)?); }
        if scores.len() != texts.len() { bail!("cross-encoder returned {} scores for {} texts", scores.len(), texts.len()); }
        Ok(scores)
    }
}

/// Fraction of distinct query terms that occur in the text.
pub struct LexicalCrossEncoder;

impl CrossEncoder for LexicalCrossEncoder {
    fn score_pairs(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        let query_lower = query.to_lowercase();
        let terms: HashSet<&str> = query_lower.split_whitespace().collect();
        if terms.is_empty() { return Ok(vec![0.0; texts.len()]); }
        Ok(texts.iter().map(|text| {
            let content_lower = text.to_lowercase();
            let hits = terms.iter().filter(|t| content_lower.contains(*t)).count();
            hits as f32 / terms.len() as f32
        }).collect())
    }
}

/// Sigmoid normalization: maps raw logits to 0-1 range.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub fn build_cross_encoder(settings: &RerankerSettings) -> Result<Arc<dyn CrossEncoder>> {
    match settings.backend {
        RerankBackend::Lexical => { info!("using lexical cross-encoder"); Ok(Arc::new(LexicalCrossEncoder)) }
        RerankBackend::Model => Ok(Arc::new(BertCrossEncoder::load(&expand_path(&settings.model_dir), settings.max_len)?)),
    }
}
