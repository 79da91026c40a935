//! Mock provider for tests and offline runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::provider::{GenerationRequest, LlmError, LlmProvider, LlmResponse};

#[derive(Debug, Clone)]
enum Behavior {
    /// Cycle through canned responses
    Canned(Vec<String>),
    /// Prefix plus the tail of the user prompt
    Echo { prefix: String, tail_chars: usize },
    /// Every call fails with this message
    Fail(String),
}

/// A mock provider with scripted behavior
///
/// Every request is recorded so tests can inspect exactly which prompts
/// went out and in which order.
#[derive(Debug)]
pub struct MockProvider {
    /// Name reported by [`LlmProvider::name`]
    pub name: String,
    behavior: Behavior,
    /// Zero-based indices of calls that fail regardless of behavior
    fail_on: Vec<usize>,
    calls: AtomicUsize,
    latency: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockProvider {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            fail_on: Vec::new(),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a new mock provider with given responses
    pub fn new(responses: Vec<String>) -> Self {
        Self::with_behavior(Behavior::Canned(responses))
    }

    /// Create a mock that always returns the same response
    pub fn constant(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }

    /// Reply with `prefix` followed by the last 50 characters of the user prompt
    pub fn echo(prefix: &str) -> Self {
        Self::with_behavior(Behavior::Echo {
            prefix: prefix.to_string(),
            tail_chars: 50,
        })
    }

    /// Fail every call
    pub fn failing(message: &str) -> Self {
        Self::with_behavior(Behavior::Fail(message.to_string()))
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Fail only the given zero-based call indices
    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_on = calls.to_vec();
        self
    }

    /// Simulated latency per call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Requests received so far, in call order
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, call: usize, request: &GenerationRequest) -> Result<String, LlmError> {
        if self.fail_on.contains(&call) {
            return Err(LlmError::RequestFailed(format!(
                "{} scripted failure on call {}",
                self.name, call
            )));
        }
        match &self.behavior {
            Behavior::Canned(responses) if responses.is_empty() => Ok(String::new()),
            Behavior::Canned(responses) => Ok(responses[call % responses.len()].clone()),
            Behavior::Echo { prefix, tail_chars } => {
                let skip = request.user.chars().count().saturating_sub(*tail_chars);
                let tail: String = request.user.chars().skip(skip).collect();
                Ok(format!("{prefix}{tail}"))
            }
            Behavior::Fail(message) => Err(LlmError::RequestFailed(message.clone())),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        !matches!(self.behavior, Behavior::Fail(_))
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let content = self.respond(call, request)?;
        Ok(LlmResponse {
            tokens_used: Some((request.user.len() / 4) as u32 + 1),
            content,
            model: format!("{}-mock", self.name),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
