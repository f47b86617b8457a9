//! Configuration loading and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (nested keys split on `__`, e.g. `APP_RETRIEVAL__TOP_K`).
//! `Settings` is the typed view consumed when wiring the pipeline.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already-assembled figment (tests, embedding in other apps).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index: IndexSettings,
    pub cache: CacheSettings,
    pub embedding: EmbeddingSettings,
    pub reranker: RerankerSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        if self.retrieval.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.top_n must be > 0".into()));
        }
        if self.retrieval.call_timeout_secs == 0 {
            return Err(Error::InvalidConfig("retrieval.call_timeout_secs must be > 0".into()));
        }
        if self.embedding.max_len == 0 || self.reranker.max_len == 0 {
            return Err(Error::InvalidConfig("model max_len must be > 0".into()));
        }
        if self.embedding.backend == EmbedBackend::Hashed && self.embedding.hashed_dim == 0 {
            return Err(Error::InvalidConfig("embedding.hashed_dim must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub uri: String,
    pub table: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self { uri: "data/lancedb".into(), table: "policy_chunks".into() }
    }
}

/// How the retriever turns a request into a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyMode {
    /// Query text only. A hit ignores the requested `top_k`.
    Query,
    /// Query text together with `top_k`.
    #[default]
    QueryAndTopK,
}

impl CacheKeyMode {
    pub fn cache_key(self, query: &str, top_k: usize) -> String {
        match self {
            Self::Query => query.to_string(),
            // digits never contain the separator, so the first one delimits
            Self::QueryAndTopK => format!("{top_k}\u{1f}{query}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: String,
    pub table: String,
    pub key_mode: CacheKeyMode,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { dir: "cache".into(), table: "query_cache".into(), key_mode: CacheKeyMode::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedBackend {
    #[default]
    Model,
    Hashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbedBackend,
    pub model_dir: String,
    pub max_len: usize,
    pub hashed_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbedBackend::Model,
            model_dir: "models/all-MiniLM-L6-v2".into(),
            max_len: 256,
            hashed_dim: 384,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankBackend {
    #[default]
    Model,
    Lexical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub backend: RerankBackend,
    pub model_dir: String,
    pub max_len: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self {
            backend: RerankBackend::Model,
            model_dir: "models/ms-marco-MiniLM-L-6-v2".into(),
            max_len: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub top_n: usize,
    pub call_timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 20, top_n: 5, call_timeout_secs: 30 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "gpt-4o-mini".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            temperature: 0.0,
            max_tokens: 500,
            timeout_secs: 60,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
