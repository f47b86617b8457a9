use std::sync::Arc;
use std::time::{Duration, Instant};

use helpmate_core::config::CacheKeyMode;
use helpmate_core::traits::{CandidateCache, Embedder, VectorIndex};
use helpmate_core::types::CandidateItem;
use helpmate_core::{Error, Result};
use tracing::{debug, info};

use crate::bounded;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// First stage: cache lookup, then query embedding + nearest-neighbour search.
///
/// A cache hit is returned as stored, without touching the embedder or the
/// index. With [`CacheKeyMode::Query`] a hit may have been produced under a
/// different `top_k` than the one requested.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    cache: Arc<dyn CandidateCache>,
    key_mode: CacheKeyMode,
    timeout: Duration,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, cache: Arc<dyn CandidateCache>) -> Self {
        Self { embedder, index, cache, key_mode: CacheKeyMode::default(), timeout: DEFAULT_CALL_TIMEOUT }
    }

    pub fn with_key_mode(mut self, key_mode: CacheKeyMode) -> Self {
        self.key_mode = key_mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<CandidateItem>> {
        if top_k == 0 {
            return Err(Error::InvalidRequest("top_k must be > 0".into()));
        }
        let key = self.key_mode.cache_key(query, top_k);
        let cached = bounded::io(self.timeout, self.cache.get(&key))
            .await
            .map_err(|e| Error::CacheUnavailable(format!("{e:#}")))?;
        if let Some(items) = cached {
            debug!(items = items.len(), "retrieval served from cache");
            return Ok(items);
        }

        let start = Instant::now();
        let vector = self.embed_query(query).await?;
        let mut items = bounded::io(self.timeout, self.index.nearest(&vector, top_k))
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("{e:#}")))?;
        items.truncate(top_k);
        info!(top_k, returned = items.len(), ms = start.elapsed().as_millis() as u64, "retrieved candidates");

        bounded::io(self.timeout, self.cache.set(&key, &items))
            .await
            .map_err(|e| Error::CacheUnavailable(format!("{e:#}")))?;
        Ok(items)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let texts = vec![query.to_string()];
        let mut vectors = bounded::blocking(self.timeout, move || embedder.embed_batch(&texts))
            .await
            .map_err(|e| Error::EmbeddingError(format!("{e:#}")))?;
        if vectors.len() != 1 {
            return Err(Error::EmbeddingError(format!("expected one vector, got {}", vectors.len())));
        }
        let vector = vectors.remove(0);
        if vector.len() != self.index.dim() {
            return Err(Error::EmbeddingError(format!(
                "query vector has {} dims but the index holds {}-d vectors",
                vector.len(),
                self.index.dim()
            )));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::EmbeddingError("query vector contains non-finite values".into()));
        }
        Ok(vector)
    }
}
