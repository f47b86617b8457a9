//! Domain types shared by the index, cache, retriever and reranker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// Metadata key holding the source page of a chunk, when known.
pub const META_PAGE: &str = "page";
/// Metadata key holding the source document of a chunk, when known.
pub const META_SOURCE: &str = "source";

/// A span of policy text that is indexed and retrieved as one unit.
///
/// - `id`: stable identifier assigned at ingest (e.g. `chunk_12`), used as the
///   citation token in prompts
/// - `text`: the chunk payload
/// - `metadata`: free-form attributes such as `page` or `source`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn new(id: impl Into<ChunkId>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into(), metadata: Meta::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn page(&self) -> Option<&str> {
        self.metadata.get(META_PAGE).map(String::as_str)
    }

    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).map(String::as_str)
    }
}

/// A chunk returned by similarity search for one query.
///
/// `rank` is the 0-based position in the index's result order and `distance`
/// is whatever the index reported for it (lower is closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateItem {
    pub chunk: Chunk,
    pub rank: usize,
    pub distance: Option<f32>,
}

impl CandidateItem {
    pub fn id(&self) -> &str {
        &self.chunk.id
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}

/// A candidate after cross-encoder scoring. Higher `score` is more relevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredItem {
    pub candidate: CandidateItem,
    pub score: f32,
}

impl ScoredItem {
    pub fn id(&self) -> &str {
        self.candidate.id()
    }

    pub fn chunk(&self) -> &Chunk {
        &self.candidate.chunk
    }
}
