use std::time::Instant;

use helpmate_core::types::ScoredItem;
use helpmate_core::{Error, Result};
use tracing::info;

use crate::rerank::Reranker;
use crate::retriever::Retriever;

pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_TOP_N: usize = 5;

/// `rerank(query, retrieve(query, top_k), top_n)`.
pub struct Pipeline {
    retriever: Retriever,
    reranker: Reranker,
    top_k: usize,
    top_n: usize,
}

impl Pipeline {
    pub fn new(retriever: Retriever, reranker: Reranker) -> Self {
        Self { retriever, reranker, top_k: DEFAULT_TOP_K, top_n: DEFAULT_TOP_N }
    }

    pub fn with_bounds(mut self, top_k: usize, top_n: usize) -> Self {
        self.top_k = top_k;
        self.top_n = top_n;
        self
    }

    pub async fn run(&self, query: &str) -> Result<Vec<ScoredItem>> {
        self.run_with(query, self.top_k, self.top_n).await
    }

    pub async fn run_with(&self, query: &str, top_k: usize, top_n: usize) -> Result<Vec<ScoredItem>> {
        if top_n == 0 {
            return Err(Error::InvalidRequest("top_n must be > 0".into()));
        }
        let start = Instant::now();
        let candidates = self.retriever.retrieve(query, top_k).await?;
        let ranked = self.reranker.rerank(query, &candidates, top_n).await?;
        info!(top_k, top_n, kept = ranked.len(), ms = start.elapsed().as_millis() as u64, "pipeline done");
        Ok(ranked)
    }
}
