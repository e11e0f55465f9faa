//! Embedding pipeline run by each worker: compose, embed, persist.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use recs_core::{EmbeddingBackend, EntityKind, EntityStore, Error, Result};

use crate::handler::{TaskContext, TaskHandler};

/// Non-empty trimmed string field of a JSON object.
fn text_field<'a>(value: &'a JsonValue, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Compose the embedding input for an entity.
///
/// Returns `None` when the field the kind requires is missing, which tells
/// the caller to fetch the full entity. Recommendations require `place_name`,
/// annotations require `content`.
pub fn compose_text(kind: EntityKind, entity: &JsonValue) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    match kind {
        EntityKind::Recommendation => {
            parts.push(text_field(entity, "place_name")?.to_string());
            if let Some(address) = text_field(entity, "address") {
                parts.push(format!("Address: {}", address));
            }
            if let Some(category) = text_field(entity, "category") {
                parts.push(format!("Category: {}", category));
            }
            if let Some(notes) = text_field(entity, "notes") {
                parts.push(notes.to_string());
            }
        }
        EntityKind::Annotation => {
            let content = text_field(entity, "content")?;
            if let Some(place) = text_field(entity, "place_name") {
                parts.push(format!("Place: {}", place));
            }
            if let Some(title) = text_field(entity, "title") {
                parts.push(title.to_string());
            }
            parts.push(content.to_string());
        }
    }

    Some(parts.join("\n"))
}

/// [`TaskHandler`] that embeds one entity and stores the vector.
pub struct EmbeddingPipeline {
    store: Arc<dyn EntityStore>,
    backend: Arc<dyn EmbeddingBackend>,
}

impl EmbeddingPipeline {
    pub fn new(store: Arc<dyn EntityStore>, backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { store, backend }
    }

    /// Text for the entity, fetching it when the payload is partial.
    async fn resolve_text(&self, kind: EntityKind, id: i64, payload: &JsonValue) -> Result<String> {
        if let Some(text) = compose_text(kind, payload) {
            return Ok(text);
        }

        debug!("Payload incomplete, fetching entity");
        let entity = self.store.fetch_entity(kind, id).await?;
        compose_text(kind, &entity).ok_or_else(|| {
            Error::InvalidInput(format!("{} {} has no embeddable content", kind, id))
        })
    }
}

#[async_trait]
impl TaskHandler for EmbeddingPipeline {
    #[instrument(
        skip(self, ctx),
        fields(
            subsystem = "jobs",
            component = "pipeline",
            task_id = %ctx.task_id,
            entity_kind = %ctx.entity_kind,
            entity_id = ctx.entity_id,
            attempt = ctx.attempt,
        )
    )]
    async fn execute(&self, ctx: TaskContext) -> Result<()> {
        let start = Instant::now();
        let kind = ctx.entity_kind;
        let id = ctx.entity_id;

        let text = self.resolve_text(kind, id, ctx.payload()).await?;

        let vector = self
            .backend
            .embed_texts(&[text])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("Backend returned no embedding".into()))?;

        self.store.persist_embedding(kind, id, vector).await?;

        debug!(
            model = self.backend.model_name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding persisted"
        );
        Ok(())
    }
}
