//! Query-time pipeline: retrieve (cache, embed, search) then rerank, plus the
//! prompt and generation stages that consume the reranked chunks.

mod bounded;

pub mod answer;
pub mod context;
pub mod generate;
pub mod pipeline;
pub mod prompt;
pub mod rerank;
pub mod retriever;

pub use answer::{Answer, Answerer};
pub use context::AppContext;
pub use generate::{Generator, OpenAiChat};
pub use pipeline::Pipeline;
pub use prompt::{ChatPrompt, PromptBuilder};
pub use rerank::{rank_by_score, Reranker};
pub use retriever::Retriever;
