pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{CandidateItem, Chunk, ChunkId, Meta, ScoredItem};
