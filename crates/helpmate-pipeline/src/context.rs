//! Explicit wiring of models, index and cache from `Settings`.

use anyhow::{Context, Result};
use lancedb::Connection;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use helpmate_core::config::{expand_path, Settings};
use helpmate_core::traits::Embedder;
use helpmate_embed::{build_cross_encoder, build_embedder};
use helpmate_vector::{open_db, ChunkWriter, LanceCandidateCache, LanceVectorIndex};

use crate::answer::Answerer;
use crate::generate::OpenAiChat;
use crate::pipeline::Pipeline;
use crate::rerank::Reranker;
use crate::retriever::Retriever;

/// Process-lifetime handles shared by every query.
pub struct AppContext {
    settings: Settings,
    embedder: Arc<dyn Embedder>,
    conn: Connection,
}

impl AppContext {
    pub async fn open(settings: Settings) -> Result<Self> {
        let embedder = build_embedder(&settings.embedding).context("loading embedding model")?;
        let uri = expand_path(&settings.index.uri);
        let conn = open_db(&uri.to_string_lossy()).await.with_context(|| format!("opening index at {}", uri.display()))?;
        info!(index = %uri.display(), dim = embedder.dim(), "context ready");
        Ok(Self { settings, embedder, conn })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }

    pub async fn chunk_writer(&self) -> Result<ChunkWriter> {
        ChunkWriter::open(&self.conn, &self.settings.index.table, self.embedder.dim()).await
    }

    pub async fn pipeline(&self) -> Result<Pipeline> {
        let timeout = Duration::from_secs(self.settings.retrieval.call_timeout_secs);
        let index = LanceVectorIndex::open(&self.conn, &self.settings.index.table, self.embedder.dim())
            .await
            .context("opening chunk index")?;
        let cache_dir = expand_path(&self.settings.cache.dir);
        let cache = LanceCandidateCache::open(&cache_dir, &self.settings.cache.table)
            .await
            .with_context(|| format!("opening cache at {}", cache_dir.display()))?;
        let cross_encoder = build_cross_encoder(&self.settings.reranker).context("loading cross-encoder")?;

        let retriever = Retriever::new(self.embedder(), Arc::new(index), Arc::new(cache))
            .with_key_mode(self.settings.cache.key_mode)
            .with_timeout(timeout);
        let reranker = Reranker::new(cross_encoder).with_timeout(timeout);
        Ok(Pipeline::new(retriever, reranker).with_bounds(self.settings.retrieval.top_k, self.settings.retrieval.top_n))
    }

    pub async fn answerer(&self) -> Result<Answerer> {
        let generator = OpenAiChat::from_settings(&self.settings.generation)?;
        Ok(Answerer::new(self.pipeline().await?, Arc::new(generator)))
    }
}
