//! Mock embedding backend for deterministic testing.
//!
//! Produces deterministic embeddings, records every call in order, and can
//! simulate latency and provider failures. Also tracks how many calls were in
//! flight at once so concurrency limits of callers can be asserted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use recs_core::EmbeddingBackend;
//! use recs_inference::mock::MockEmbeddingBackend;
//!
//! # async fn demo() {
//! let backend = MockEmbeddingBackend::new()
//!     .with_dimension(8)
//!     .with_failures(1);
//!
//! assert!(backend.embed_texts(&["a".to_string()]).await.is_err());
//! assert!(backend.embed_texts(&["a".to_string()]).await.is_ok());
//! assert_eq!(backend.call_count(), 2);
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use recs_core::{EmbeddingBackend, Error, Result, Vector};

/// How the mock decides whether a call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    Never,
    /// Fail the first `n` calls, then succeed.
    First(usize),
    Always,
}

/// Mock embedding backend for testing.
#[derive(Clone)]
pub struct MockEmbeddingBackend {
    dimension: usize,
    latency: Duration,
    failure: FailureMode,
    calls: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockEmbeddingBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            dimension: 16,
            latency: Duration::ZERO,
            failure: FailureMode::Never,
            calls: Arc::new(Mutex::new(Vec::new())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set simulated latency for every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the first `n` calls with a provider error.
    pub fn with_failures(mut self, n: usize) -> Self {
        self.failure = FailureMode::First(n);
        self
    }

    /// Fail every call with a provider error.
    pub fn always_failing(mut self) -> Self {
        self.failure = FailureMode::Always;
        self
    }

    /// Texts received, one entry per call, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of calls observed in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Deterministic unit vector derived from the text.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0; self.dimension];
        if self.dimension == 0 {
            return vec;
        }

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % self.dimension;
            vec[idx] += 0.1;
        }

        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
        vec
    }

    /// Record the call and return whether it should fail.
    fn record(&self, texts: &[String]) -> bool {
        let mut calls = self.calls.lock().unwrap();
        let call_index = calls.len();
        calls.push(texts.join("\n"));

        match self.failure {
            FailureMode::Never => false,
            FailureMode::First(n) => call_index < n,
            FailureMode::Always => true,
        }
    }
}

impl Default for MockEmbeddingBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter when a call finishes or is dropped.
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbeddingBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(self.in_flight.clone());
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let should_fail = self.record(texts);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if should_fail {
            return Err(Error::Embedding("Simulated provider failure".to_string()));
        }

        Ok(texts
            .iter()
            .map(|t| Vector::from(self.vector_for(t)))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_embed() {
        let backend = MockEmbeddingBackend::new().with_dimension(128);

        let vectors = backend.embed_texts(&["test".to_string()]).await.unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].as_slice().len(), 128);
    }

    #[tokio::test]
    async fn test_mock_backend_deterministic() {
        let backend = MockEmbeddingBackend::new();
        let text = vec!["coffee near the river".to_string()];

        let e1 = backend.embed_texts(&text).await.unwrap();
        let e2 = backend.embed_texts(&text).await.unwrap();

        assert_eq!(e1[0].as_slice(), e2[0].as_slice());
    }

    #[tokio::test]
    async fn test_mock_backend_fails_first_calls() {
        let backend = MockEmbeddingBackend::new().with_failures(2);
        let text = vec!["x".to_string()];

        assert!(backend.embed_texts(&text).await.is_err());
        assert!(backend.embed_texts(&text).await.is_err());
        assert!(backend.embed_texts(&text).await.is_ok());
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_backend_always_failing() {
        let backend = MockEmbeddingBackend::new().always_failing();
        for _ in 0..5 {
            let err = backend
                .embed_texts(&["x".to_string()])
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Embedding(_)));
        }
    }

    #[tokio::test]
    async fn test_mock_backend_records_calls_in_order() {
        let backend = MockEmbeddingBackend::new();
        backend.embed_texts(&["first".to_string()]).await.unwrap();
        backend.embed_texts(&["second".to_string()]).await.unwrap();

        assert_eq!(backend.calls(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_mock_backend_clones_share_state() {
        let backend = MockEmbeddingBackend::new();
        let clone = backend.clone();
        clone.embed_texts(&["shared".to_string()]).await.unwrap();
        assert_eq!(backend.call_count(), 1);
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[test]
    fn test_vector_for_is_unit_length() {
        let backend = MockEmbeddingBackend::new().with_dimension(32);
        let v = backend.vector_for("hello world");
        let magnitude: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }
}
