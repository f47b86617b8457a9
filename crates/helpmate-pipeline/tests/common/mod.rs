#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use helpmate_core::traits::{CandidateCache, ChunkSink, CrossEncoder, Embedder, VectorIndex};
use helpmate_core::types::{CandidateItem, Chunk};
use helpmate_vector::{open_db, ChunkWriter, LanceVectorIndex};

pub const QUERY: &str = "What is the scheduled benefit for all members?";

/// Embeds only the texts it was given vectors for; counts calls.
pub struct TableEmbedder { pub vectors: HashMap<String, Vec<f32>>, pub dim: usize, pub calls: AtomicUsize }

impl TableEmbedder {
    pub fn new(dim: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        let vectors = entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Self { vectors, dim, calls: AtomicUsize::new(0) }
    }
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.vectors.get(t).cloned().ok_or_else(|| anyhow!("no vector for '{t}'"))).collect()
    }
}

pub struct SlowEmbedder(pub std::time::Duration);

impl Embedder for SlowEmbedder {
    fn dim(&self) -> usize { 3 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        std::thread::sleep(self.0);
        Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
    }
}

pub struct SlowIndex(pub std::time::Duration);

#[async_trait]
impl VectorIndex for SlowIndex {
    fn dim(&self) -> usize { 3 }
    async fn nearest(&self, _vector: &[f32], _k: usize) -> anyhow::Result<Vec<CandidateItem>> {
        tokio::time::sleep(self.0).await;
        Ok(Vec::new())
    }
}

/// Sleeps on reads, writes or both.
pub struct SlowCache { pub delay: std::time::Duration, pub slow_get: bool, pub slow_set: bool, pub inner: MemoryCache }

impl SlowCache {
    pub fn on_get(delay: std::time::Duration) -> Self {
        Self { delay, slow_get: true, slow_set: false, inner: MemoryCache::default() }
    }
    pub fn on_set(delay: std::time::Duration) -> Self {
        Self { delay, slow_get: false, slow_set: true, inner: MemoryCache::default() }
    }
}

#[async_trait]
impl CandidateCache for SlowCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<CandidateItem>>> {
        if self.slow_get { tokio::time::sleep(self.delay).await; }
        self.inner.get(key).await
    }
    async fn set(&self, key: &str, value: &[CandidateItem]) -> anyhow::Result<()> {
        if self.slow_set { tokio::time::sleep(self.delay).await; }
        self.inner.set(key, value).await
    }
}

/// Wraps any index and counts queries.
pub struct CountingIndex { pub inner: Arc<dyn VectorIndex>, pub calls: AtomicUsize }

impl CountingIndex {
    pub fn new(inner: Arc<dyn VectorIndex>) -> Self { Self { inner, calls: AtomicUsize::new(0) } }
    pub fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl VectorIndex for CountingIndex {
    fn dim(&self) -> usize { self.inner.dim() }
    async fn nearest(&self, vector: &[f32], k: usize) -> anyhow::Result<Vec<CandidateItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.nearest(vector, k).await
    }
}

pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    fn dim(&self) -> usize { 3 }
    async fn nearest(&self, _vector: &[f32], _k: usize) -> anyhow::Result<Vec<CandidateItem>> {
        Err(anyhow!("index files are corrupt"))
    }
}

#[derive(Default)]
pub struct MemoryCache { pub entries: Mutex<HashMap<String, Vec<CandidateItem>>> }

impl MemoryCache {
    pub fn len(&self) -> usize { self.entries.lock().unwrap().len() }
}

#[async_trait]
impl CandidateCache for MemoryCache {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<CandidateItem>>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }
    async fn set(&self, key: &str, value: &[CandidateItem]) -> anyhow::Result<()> {
        self.entries.lock().unwrap().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

pub struct FailingCache;

#[async_trait]
impl CandidateCache for FailingCache {
    async fn get(&self, _key: &str) -> anyhow::Result<Option<Vec<CandidateItem>>> {
        Err(anyhow!("permission denied"))
    }
    async fn set(&self, _key: &str, _value: &[CandidateItem]) -> anyhow::Result<()> {
        Err(anyhow!("permission denied"))
    }
}

/// Scores by chunk text; unknown texts score 0.
pub struct FixedScores(pub HashMap<String, f32>);

impl FixedScores {
    pub fn new(entries: &[(&str, f32)]) -> Self {
        Self(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
    }
}

impl CrossEncoder for FixedScores {
    fn score_pairs(&self, _query: &str, texts: &[String]) -> anyhow::Result<Vec<f32>> {
        Ok(texts.iter().map(|t| self.0.get(t).copied().unwrap_or(0.0)).collect())
    }
}

pub struct BrokenCrossEncoder;

impl CrossEncoder for BrokenCrossEncoder {
    fn score_pairs(&self, _query: &str, _texts: &[String]) -> anyhow::Result<Vec<f32>> {
        Err(anyhow!("model weights missing"))
    }
}

pub fn policy_chunks() -> Vec<Chunk> {
    vec![
        Chunk::new("chunk_0", "The scheduled benefit for all members is $10,000.").with_meta("page", "14"),
        Chunk::new("chunk_1", "Notice of claim must be sent within 20 days.").with_meta("page", "31"),
        Chunk::new("chunk_2", "Member life insurance schedule of benefits.").with_meta("page", "9"),
    ]
}

pub fn unit_vectors() -> Vec<Vec<f32>> {
    vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]
}

/// Lance index in `dir` holding the three policy chunks along the axes.
pub async fn seeded_index(dir: &std::path::Path) -> anyhow::Result<Arc<LanceVectorIndex>> {
    let conn = open_db(&dir.to_string_lossy()).await?;
    let writer = ChunkWriter::open(&conn, "policy_chunks", 3).await?;
    writer.upsert(&policy_chunks(), &unit_vectors()).await?;
    Ok(Arc::new(LanceVectorIndex::open(&conn, "policy_chunks", 3).await?))
}

pub async fn empty_index(dir: &std::path::Path) -> anyhow::Result<Arc<LanceVectorIndex>> {
    let conn = open_db(&dir.to_string_lossy()).await?;
    Ok(Arc::new(LanceVectorIndex::open(&conn, "policy_chunks", 3).await?))
}
