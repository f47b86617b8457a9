use async_trait::async_trait;

use crate::types::{CandidateItem, Chunk};

/// Text to fixed-length vector. Must be deterministic and must match the
/// embedder that populated the index being queried.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Joint relevance scoring of `(query, text)` pairs. One score per text,
/// in input order; higher is more relevant.
pub trait CrossEncoder: Send + Sync {
    fn score_pairs(&self, query: &str, texts: &[String]) -> anyhow::Result<Vec<f32>>;
}

/// Persistent nearest-neighbour index over chunk vectors.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn dim(&self) -> usize;
    /// Up to `k` nearest chunks, closest first. An empty index yields an empty list.
    async fn nearest(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<CandidateItem>>;
}

/// Writer side of the index, used at ingest time.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> anyhow::Result<usize>;
}

/// Durable store of raw retrieval results keyed by an opaque string.
#[async_trait]
pub trait CandidateCache: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<CandidateItem>>>;
    async fn set(&self, key: &str, value: &[CandidateItem]) -> anyhow::Result<()>;
}
