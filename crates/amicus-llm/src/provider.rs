//! Provider trait and common request/result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default output budget
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1200;
/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from providers
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Blocked by provider: {0}")]
    Blocked(String),
    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A single generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// System instructions (role/persona)
    pub system: String,
    /// User content
    pub user: String,
    /// Sampling temperature, 0.0..=2.0
    pub temperature: f32,
    /// Maximum tokens to generate, > 0
    pub max_output_tokens: u32,
    /// Wall-clock budget for the whole call
    pub timeout: Duration,
    /// Provider-specific fields merged into the request body
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GenerationRequest {
    /// Create a request with default sampling settings
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            extra: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Check sampling parameters before anything goes over the wire
    pub fn validate(&self) -> Result<(), LlmError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(LlmError::InvalidRequest(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(LlmError::InvalidRequest(
                "max_output_tokens must be positive".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(LlmError::InvalidRequest("timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Raw successful response from a backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,
    /// Model used
    pub model: String,
    /// Tokens used (if available)
    pub tokens_used: Option<u32>,
    /// Time taken in milliseconds
    pub latency_ms: u64,
}

/// Metadata attached to every generation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub provider: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub latency_ms: u64,
    /// When set, `text` describes a failure instead of carrying an answer
    pub error: bool,
}

/// Outcome of a generation call; failures are data, not errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub meta: GenerationMeta,
}

impl GenerationResult {
    pub fn is_error(&self) -> bool {
        self.meta.error
    }

    /// Error-flagged result with a human-readable description
    pub fn failure(provider: &str, error: &LlmError, latency_ms: u64) -> Self {
        Self {
            text: format!("[{provider} error] {error}"),
            meta: GenerationMeta {
                provider: provider.to_string(),
                model: None,
                tokens_used: None,
                latency_ms,
                error: true,
            },
        }
    }

    fn success(provider: &str, response: LlmResponse) -> Self {
        Self {
            text: response.content,
            meta: GenerationMeta {
                provider: provider.to_string(),
                model: Some(response.model),
                tokens_used: response.tokens_used,
                latency_ms: response.latency_ms,
                error: false,
            },
        }
    }
}

/// Trait for text generation providers
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Check if the provider is reachable
    async fn is_available(&self) -> bool;

    /// Backend-specific call; may fail
    async fn complete(&self, request: &GenerationRequest) -> Result<LlmResponse, LlmError>;

    /// Generate text, never failing.
    ///
    /// Validation errors, backend errors and timeouts all come back as an
    /// error-flagged [`GenerationResult`].
    async fn generate(&self, request: GenerationRequest) -> GenerationResult {
        let start = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        if let Err(e) = request.validate() {
            tracing::warn!(provider = %self.name(), error = %e, "Rejected generation request");
            return GenerationResult::failure(self.name(), &e, 0);
        }

        match tokio::time::timeout(request.timeout, self.complete(&request)).await {
            Ok(Ok(response)) => GenerationResult::success(self.name(), response),
            Ok(Err(e)) => {
                tracing::warn!(provider = %self.name(), error = %e, "Generation degraded");
                GenerationResult::failure(self.name(), &e, elapsed(start))
            }
            Err(_) => {
                let e = LlmError::Timeout(request.timeout);
                tracing::warn!(provider = %self.name(), error = %e, "Generation timed out");
                GenerationResult::failure(self.name(), &e, elapsed(start))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds() {
        assert!(GenerationRequest::new("s", "u").validate().is_ok());
        assert!(GenerationRequest::new("s", "u")
            .with_temperature(2.0)
            .validate()
            .is_ok());
        assert!(GenerationRequest::new("s", "u")
            .with_temperature(2.5)
            .validate()
            .is_err());
        assert!(GenerationRequest::new("s", "u")
            .with_temperature(-0.1)
            .validate()
            .is_err());
        assert!(GenerationRequest::new("s", "u")
            .with_max_output_tokens(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_failure_text() {
        let result = GenerationResult::failure("gemini", &LlmError::RateLimited, 12);
        assert!(result.is_error());
        assert_eq!(result.text, "[gemini error] Rate limited");
        assert_eq!(result.meta.latency_ms, 12);
    }

    #[test]
    fn test_timeout_message() {
        let e = LlmError::Timeout(Duration::from_secs(60));
        assert_eq!(e.to_string(), "Timed out after 60s");
    }
}
