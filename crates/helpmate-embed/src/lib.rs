//! Local text models for the retrieval pipeline.
//!
//! - [`SentenceEmbedder`]: BERT sentence-transformer, masked mean pooling + L2
//! - [`BertCrossEncoder`]: BERT with a single-logit relevance head
//! - [`HashedEmbedder`] / [`LexicalCrossEncoder`]: deterministic stand-ins
//!   used in development and tests (no model files required)

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use candle_core::Device;
use candle_transformers::models::bert::BertModel;
use helpmate_core::config::{expand_path, EmbedBackend, EmbeddingSettings};
use helpmate_core::traits::Embedder;
use helpmate_core::Error;
use tokenizers::Tokenizer;
use tracing::{info, warn};

pub mod cross_encoder;
pub mod device;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use cross_encoder::{build_cross_encoder, sigmoid, BertCrossEncoder, LexicalCrossEncoder};
pub use pool::masked_mean_l2;

const EMBED_BATCH: usize = 32;

pub struct SentenceEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize, pad_id: u32 }

impl SentenceEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        let loaded = model::load_bert(model_dir, &device)?;
        let pad_id = tokenize::pad_id(&loaded.tokenizer);
        Ok(Self { model: loaded.model, tokenizer: loaded.tokenizer, device, dim: loaded.hidden_size, max_len, pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let enc = tokenize::encode_batch(&self.tokenizer, texts.to_vec(), self.max_len, self.pad_id, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        Ok(pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?)
    }
}

impl Embedder for SentenceEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_BATCH) { out.extend(self.embed_chunk(chunk)?); }
        if texts.len() == 1 && start.elapsed().as_millis() > 100 { warn!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(out)
    }
}

/// Token-hash embedder: each whitespace token bumps one bucket, then L2.
pub struct HashedEmbedder { dim: usize }

impl HashedEmbedder {
    pub fn new(dim: usize) -> helpmate_core::Result<Self> {
        if dim == 0 { return Err(Error::InvalidConfig("embedding.hashed_dim must be > 0".into())); }
        Ok(Self { dim })
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() { let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish(); let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32); v[idx] += val + (i as f32 % 3.0) * 0.01; }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } v
    }
}

impl Embedder for HashedEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|t| self.embed_one(t)).collect()) }
}

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the hashed one.
pub fn build_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if use_fake || settings.backend == EmbedBackend::Hashed {
        info!(dim = settings.hashed_dim, "using hashed embedder");
        return Ok(Arc::new(HashedEmbedder::new(settings.hashed_dim)?));
    }
    let dir = expand_path(&settings.model_dir);
    Ok(Arc::new(SentenceEmbedder::load(&dir, settings.max_len)?))
}
