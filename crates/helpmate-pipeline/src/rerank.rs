use std::cmp::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use helpmate_core::traits::CrossEncoder;
use helpmate_core::types::{CandidateItem, ScoredItem};
use helpmate_core::{Error, Result};
use tracing::info;

use crate::bounded;
use crate::retriever::DEFAULT_CALL_TIMEOUT;

/// Second stage: cross-encoder scoring of the retrieved candidates.
/// Stateless; every call rescores.
pub struct Reranker {
    model: Arc<dyn CrossEncoder>,
    timeout: Duration,
}

impl Reranker {
    pub fn new(model: Arc<dyn CrossEncoder>) -> Self {
        Self { model, timeout: DEFAULT_CALL_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn rerank(&self, query: &str, items: &[CandidateItem], top_n: usize) -> Result<Vec<ScoredItem>> {
        if top_n == 0 {
            return Err(Error::InvalidRequest("top_n must be > 0".into()));
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let model = Arc::clone(&self.model);
        let query_owned = query.to_string();
        let texts: Vec<String> = items.iter().map(|it| it.chunk.text.clone()).collect();
        let scores = bounded::blocking(self.timeout, move || model.score_pairs(&query_owned, &texts))
            .await
            .map_err(|e| Error::RerankUnavailable(format!("{e:#}")))?;
        let ranked = rank_by_score(items, &scores, top_n)?;
        info!(candidates = items.len(), kept = ranked.len(), ms = start.elapsed().as_millis() as u64, "reranked");
        Ok(ranked)
    }
}

/// Pair candidates with their scores, sort descending and keep `top_n`.
/// Equal scores keep candidate order.
pub fn rank_by_score(items: &[CandidateItem], scores: &[f32], top_n: usize) -> Result<Vec<ScoredItem>> {
    if scores.len() != items.len() {
        return Err(Error::RerankUnavailable(format!("{} scores for {} candidates", scores.len(), items.len())));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(Error::RerankUnavailable(format!("non-finite score for candidate '{}'", items[i].id())));
    }
    let mut scored: Vec<ScoredItem> = items
        .iter()
        .cloned()
        .zip(scores.iter().copied())
        .map(|(candidate, score)| ScoredItem { candidate, score })
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    scored.truncate(top_n);
    Ok(scored)
}
