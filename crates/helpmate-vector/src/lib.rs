//! LanceDB storage for the retrieval pipeline: the chunk index (search and
//! ingest) and the on-disk fingerprint cache.

pub mod cache;
pub mod index;
pub mod schema;
pub mod table;
pub mod writer;

pub use cache::{fingerprint, LanceCandidateCache};
pub use index::LanceVectorIndex;
pub use table::open_db;
pub use writer::ChunkWriter;
