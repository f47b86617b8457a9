//! Chat-completion client for the answer generation stage.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use helpmate_core::config::GenerationSettings;
use helpmate_core::Error;

use crate::prompt::ChatPrompt;

#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String>;
}

/// OpenAI-compatible `/v1/chat/completions` client.
pub struct OpenAiChat {
    client: reqwest::Client,
    settings: GenerationSettings,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(settings: GenerationSettings, api_key: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), settings, api_key: api_key.into() }
    }

    /// Reads the key from the environment variable named by `api_key_env`.
    pub fn from_settings(settings: &GenerationSettings) -> helpmate_core::Result<Self> {
        let api_key = std::env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("environment variable {} is not set", settings.api_key_env)))?;
        Ok(Self::new(settings.clone(), api_key))
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body(&self, prompt: &ChatPrompt) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage { role: "system".into(), content: prompt.system.clone() },
                ChatMessage { role: "user".into(), content: prompt.user.clone() },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

#[async_trait]
impl Generator for OpenAiChat {
    async fn complete(&self, prompt: &ChatPrompt) -> Result<String> {
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(self.settings.timeout_secs))
            .json(&self.request_body(prompt))
            .send()
            .await
            .context("Failed to reach chat completion endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completion returned {status}: {body}");
        }

        let body: ChatResponse = resp.json().await.context("Failed to parse chat completion response")?;
        first_choice(body)
    }
}

fn first_choice(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .context("chat completion returned no content")
}

// ─── Request/Response types ────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
