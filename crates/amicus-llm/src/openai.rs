//! OpenAI chat completions provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::provider::{GenerationRequest, LlmError, LlmProvider, LlmResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// OpenAI API request format
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    /// Caller-supplied fields, merged at the top level of the body
    #[serde(flatten)]
    extra: Option<&'a serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// OpenAI API response format
#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
    model: String,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageContent,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// OpenAI provider
#[derive(Debug)]
pub struct OpenAIProvider {
    /// API key
    api_key: String,
    /// Model to use (e.g., "gpt-4o")
    model: String,
    /// HTTP client
    client: reqwest::Client,
    /// Base URL
    base_url: String,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create with GPT-4o
    pub fn gpt4o(api_key: &str) -> Self {
        Self::new(api_key, DEFAULT_MODEL)
    }

    /// Point at a compatible endpoint (proxy, Azure gateway, local server)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = OpenAIRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            extra: request.extra.as_ref(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed(format!(
                "Status: {}, Body: {}",
                status, body
            )));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices returned".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(LlmError::Blocked(refusal));
        }
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(LlmError::Blocked("content_filter".to_string()));
        }

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: api_response.model,
            tokens_used: api_response.usage.map(|u| u.total_tokens),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extra_fields_are_merged_into_body() {
        let mut extra = serde_json::Map::new();
        extra.insert("seed".into(), json!(7));
        extra.insert("response_format".into(), json!({"type": "text"}));

        let body = OpenAIRequest {
            model: "gpt-4o",
            messages: vec![Message {
                role: "user",
                content: "hi",
            }],
            temperature: 0.1,
            max_tokens: 900,
            extra: Some(&extra),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["seed"], 7);
        assert_eq!(value["response_format"]["type"], "text");
        assert_eq!(value["max_tokens"], 900);
    }

    #[test]
    fn test_body_without_extra() {
        let body = OpenAIRequest {
            model: "gpt-4o",
            messages: vec![],
            temperature: 0.2,
            max_tokens: 10,
            extra: None,
        };
        let value = serde_json::to_value(&body).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let provider = OpenAIProvider::gpt4o("sk-test").with_base_url("http://localhost:8080/");
        assert_eq!(provider.base_url, "http://localhost:8080");
        assert_eq!(provider.model(), "gpt-4o");
    }
}
