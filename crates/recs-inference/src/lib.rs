//! # recs-inference
//!
//! Embedding backends for recs.
//!
//! This crate provides:
//! - Ollama implementation of [`EmbeddingBackend`] (default, feature `ollama`)
//! - Deterministic mock backend for tests (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use recs_inference::OllamaBackend;
//! use recs_core::EmbeddingBackend;
//!
//! #[tokio::main]
//! async fn main() -> recs_core::Result<()> {
//!     let backend = OllamaBackend::from_env()?;
//!     let texts = vec!["Cozy ramen bar with late hours".to_string()];
//!     let embeddings = backend.embed_texts(&texts).await?;
//!     assert_eq!(embeddings.len(), 1);
//!     Ok(())
//! }
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

// Mock embedding backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use recs_core::*;

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;
