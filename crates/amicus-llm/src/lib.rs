//! # Amicus LLM
//!
//! Text generation and embedding backends.
//!
//! ## Supported Backends
//!
//! | Provider | Type | Key Required |
//! |----------|------|--------------|
//! | OpenAI | API | `OPENAI_API_KEY` |
//! | Gemini | API | `GEMINI_API_KEY` |
//! | Mock | Testing | None |
//!
//! Generation never fails from the caller's point of view: backend errors,
//! safety blocks and timeouts come back as an error-flagged
//! [`GenerationResult`] whose text describes what went wrong.
//!
//! ## Quick Start
//!
//! ```rust
//! use amicus_llm::{GenerationRequest, LlmProvider, MockProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let llm = MockProvider::constant("Verdict: PASS");
//!     let result = llm
//!         .generate(GenerationRequest::new("You are a judge.", "Synthesize."))
//!         .await;
//!     assert!(!result.is_error());
//!     println!("{}", result.text);
//! }
//! ```
//!
//! ## Embeddings
//!
//! ```rust
//! use amicus_llm::{Embedder, HashingEmbedder};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let embedder = HashingEmbedder::new(256);
//! let vectors = embedder.embed(&["I-907 fee".to_string()]).await.unwrap();
//! assert_eq!(vectors[0].len(), 256);
//! # }
//! ```

pub mod cached_embedder;
pub mod config;
pub mod embedding;
pub mod gemini;
pub mod mock;
pub mod openai;
pub mod provider;

pub use cached_embedder::{CachedEmbedder, EmbeddingCacheConfig};
pub use config::{ConfigError, EmbedderKind, LlmConfig, ProviderKind};
pub use embedding::{Embedder, EmbeddingError, HashingEmbedder, OpenAIEmbedder};
pub use gemini::GeminiProvider;
pub use mock::MockProvider;
pub use openai::OpenAIProvider;
pub use provider::{
    GenerationMeta, GenerationRequest, GenerationResult, LlmError, LlmProvider, LlmResponse,
};
