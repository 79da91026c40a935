//! Provider configuration
//!
//! Handles API keys, model names and embedder selection. Everything is read
//! from the environment; nothing is persisted.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cached_embedder::CachedEmbedder;
use crate::embedding::{
    Embedder, HashingEmbedder, OpenAIEmbedder, DEFAULT_EMBEDDING_DIMENSION,
    DEFAULT_EMBEDDING_MODEL,
};
use crate::gemini::{self, GeminiProvider};
use crate::mock::MockProvider;
use crate::openai::{self, OpenAIProvider};
use crate::provider::LlmProvider;

/// Error types for configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    /// Offline echo provider
    Mock,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" | "google" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::Invalid(format!("unknown provider: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    OpenAI,
    Hashing,
}

impl FromStr for EmbedderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "hashing" => Ok(Self::Hashing),
            other => Err(ConfigError::Invalid(format!("unknown embedder: {other}"))),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI API key (env: OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
    /// env: OPENAI_MODEL
    pub openai_model: String,
    /// env: OPENAI_BASE_URL
    pub openai_base_url: String,
    /// Gemini API key (env: GEMINI_API_KEY)
    pub gemini_api_key: Option<String>,
    /// env: GEMINI_MODEL
    pub gemini_model: String,
    /// env: AMICUS_EMBEDDER (defaults to openai when a key is present)
    pub embedder: EmbedderKind,
    /// env: OPENAI_EMBEDDING_MODEL
    pub embedding_model: String,
    /// env: AMICUS_EMBEDDING_DIM
    pub embedding_dimension: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: openai::DEFAULT_MODEL.to_string(),
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_model: gemini::DEFAULT_MODEL.to_string(),
            embedder: EmbedderKind::Hashing,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl LlmConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let openai_api_key = non_empty_var("OPENAI_API_KEY");

        let embedder = match non_empty_var("AMICUS_EMBEDDER") {
            Some(value) => value.parse()?,
            None if openai_api_key.is_some() => EmbedderKind::OpenAI,
            None => EmbedderKind::Hashing,
        };

        let embedding_dimension = match non_empty_var("AMICUS_EMBEDDING_DIM") {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|d| *d > 0)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("AMICUS_EMBEDDING_DIM must be a positive integer, got {value}"))
                })?,
            None => defaults.embedding_dimension,
        };

        Ok(Self {
            openai_api_key,
            openai_model: non_empty_var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: non_empty_var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            gemini_api_key: non_empty_var("GEMINI_API_KEY"),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            embedder,
            embedding_model: non_empty_var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            embedding_dimension,
        })
    }

    /// Check if a provider is configured
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        match kind {
            ProviderKind::OpenAI => self.openai_api_key.is_some(),
            ProviderKind::Gemini => self.gemini_api_key.is_some(),
            ProviderKind::Mock => true,
        }
    }

    /// List available providers
    pub fn available_providers(&self) -> Vec<ProviderKind> {
        [ProviderKind::OpenAI, ProviderKind::Gemini, ProviderKind::Mock]
            .into_iter()
            .filter(|kind| self.is_configured(*kind))
            .collect()
    }

    /// Build a provider for the given backend
    pub fn build_provider(&self, kind: ProviderKind) -> Result<Arc<dyn LlmProvider>, ConfigError> {
        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::OpenAI => {
                let key = self
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".into()))?;
                Arc::new(
                    OpenAIProvider::new(key, &self.openai_model)
                        .with_base_url(&self.openai_base_url),
                )
            }
            ProviderKind::Gemini => {
                let key = self
                    .gemini_api_key
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".into()))?;
                Arc::new(GeminiProvider::new(key, &self.gemini_model))
            }
            ProviderKind::Mock => Arc::new(MockProvider::echo("[mock] ")),
        };
        tracing::debug!(provider = %kind, "Built provider");
        Ok(provider)
    }

    /// Build the configured embedder, wrapped in a cache
    pub fn build_embedder(&self) -> Result<Arc<dyn Embedder>, ConfigError> {
        let embedder: Arc<dyn Embedder> = match self.embedder {
            EmbedderKind::OpenAI => {
                let key = self
                    .openai_api_key
                    .as_deref()
                    .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".into()))?;
                Arc::new(CachedEmbedder::wrap(
                    OpenAIEmbedder::new(key, &self.embedding_model, self.embedding_dimension)
                        .with_base_url(&self.openai_base_url),
                ))
            }
            EmbedderKind::Hashing => Arc::new(CachedEmbedder::wrap(HashingEmbedder::new(
                self.embedding_dimension,
            ))),
        };
        Ok(embedder)
    }
}
