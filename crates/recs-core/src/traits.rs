//! Collaborator traits consumed by the embedding scheduler.
//!
//! Implementations live outside the scheduler: `recs-db` provides the
//! PostgreSQL entity store and `recs-inference` the embedding backends.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::{EntityKind, Result, Vector};

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Read and write access to embeddable entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch the full entity as a JSON object.
    ///
    /// Used when a task was enqueued with a partial payload.
    async fn fetch_entity(&self, kind: EntityKind, id: i64) -> Result<JsonValue>;

    /// Store the embedding for an entity, overwriting any previous vector.
    async fn persist_embedding(&self, kind: EntityKind, id: i64, vector: Vector) -> Result<()>;

    /// List entity ids of a kind in ascending order.
    ///
    /// With `only_missing`, only rows without an embedding are returned.
    async fn list_ids(&self, kind: EntityKind, only_missing: bool) -> Result<Vec<i64>>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts.
    ///
    /// Returns a vector of embedding vectors, one per input text.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
