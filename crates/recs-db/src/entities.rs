//! Entity store implementation over PostgreSQL + pgvector.

use async_trait::async_trait;
use pgvector::Vector;
use serde_json::Value as JsonValue;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, instrument};

use recs_core::{EntityKind, EntityStore, Error, Result};

/// Query returning one entity as a JSON object with the fields the embedding
/// pipeline composes text from.
fn fetch_query(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Recommendation => {
            "SELECT jsonb_build_object(
                 'id', r.id,
                 'user_id', r.user_id,
                 'place_name', r.place_name,
                 'address', r.address,
                 'category', r.category,
                 'notes', r.notes
             ) AS entity
             FROM recommendations r
             WHERE r.id = $1"
        }
        EntityKind::Annotation => {
            "SELECT jsonb_build_object(
                 'id', a.id,
                 'user_id', a.user_id,
                 'recommendation_id', a.recommendation_id,
                 'title', a.title,
                 'content', a.content,
                 'place_name', r.place_name
             ) AS entity
             FROM annotations a
             LEFT JOIN recommendations r ON r.id = a.recommendation_id
             WHERE a.id = $1"
        }
    }
}

fn persist_query(kind: EntityKind) -> String {
    format!(
        "UPDATE {} SET embedding = $1 WHERE id = $2",
        kind.table_name()
    )
}

fn list_ids_query(kind: EntityKind, only_missing: bool) -> String {
    let filter = if only_missing {
        " WHERE embedding IS NULL"
    } else {
        ""
    };
    format!("SELECT id FROM {}{} ORDER BY id", kind.table_name(), filter)
}

/// PostgreSQL implementation of [`EntityStore`].
#[derive(Clone)]
pub struct PgEntityStore {
    pool: Pool<Postgres>,
}

impl PgEntityStore {
    /// Create a new PgEntityStore with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    #[instrument(skip(self), fields(subsystem = "db", component = "entity_store", op = "fetch_entity"))]
    async fn fetch_entity(&self, kind: EntityKind, id: i64) -> Result<JsonValue> {
        let row = sqlx::query(fetch_query(kind))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        match row {
            Some(row) => Ok(row.get::<JsonValue, _>("entity")),
            None => Err(Error::EntityNotFound { kind, id }),
        }
    }

    #[instrument(skip(self, vector), fields(subsystem = "db", component = "entity_store", op = "persist_embedding"))]
    async fn persist_embedding(&self, kind: EntityKind, id: i64, vector: Vector) -> Result<()> {
        let result = sqlx::query(&persist_query(kind))
            .bind(vector)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::EntityNotFound { kind, id });
        }
        debug!("Embedding stored");
        Ok(())
    }

    async fn list_ids(&self, kind: EntityKind, only_missing: bool) -> Result<Vec<i64>> {
        let rows = sqlx::query(&list_ids_query(kind, only_missing))
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.into_iter().map(|row| row.get::<i64, _>("id")).collect())
    }
}
