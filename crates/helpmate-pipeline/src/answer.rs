use std::sync::Arc;

use helpmate_core::types::ScoredItem;
use helpmate_core::{Error, Result};
use tracing::info;

use crate::generate::Generator;
use crate::pipeline::Pipeline;
use crate::prompt::{PromptBuilder, NOT_FOUND_ANSWER};

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Chunks handed to the generator, best first.
    pub sources: Vec<ScoredItem>,
}

/// Retrieval pipeline + prompt + generation.
pub struct Answerer {
    pipeline: Pipeline,
    prompts: PromptBuilder,
    generator: Arc<dyn Generator>,
}

impl Answerer {
    pub fn new(pipeline: Pipeline, generator: Arc<dyn Generator>) -> Self {
        Self { pipeline, prompts: PromptBuilder::default(), generator }
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let sources = self.pipeline.run(query).await?;
        if sources.is_empty() {
            info!("no candidates; skipping generation");
            return Ok(Answer { text: NOT_FOUND_ANSWER.to_string(), sources });
        }
        let prompt = self.prompts.build(query, &sources);
        let text = self
            .generator
            .complete(&prompt)
            .await
            .map_err(|e| Error::GenerationFailed(format!("{e:#}")))?;
        Ok(Answer { text: text.trim().to_string(), sources })
    }
}
