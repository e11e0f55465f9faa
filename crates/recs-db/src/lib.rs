//! # recs-db
//!
//! PostgreSQL database layer for recs embedding generation.
//!
//! This crate provides:
//! - Connection pool management with linear connect retry
//! - [`PgEntityStore`], the pgvector-backed [`EntityStore`] the scheduler
//!   fetches entities from and writes embeddings to
//!
//! Schema management is not part of this crate; the tables are owned by the
//! application.
//!
//! ## Example
//!
//! ```rust,ignore
//! use recs_db::{connect_with_retry, Database, PoolConfig};
//! use std::time::Duration;
//!
//! let pool = connect_with_retry(
//!     "postgres://localhost/recs",
//!     &PoolConfig::default(),
//!     5,
//!     Duration::from_secs(1),
//! )
//! .await?;
//! let db = Database::new(pool);
//! let ids = db.entities.list_ids(EntityKind::Recommendation, true).await?;
//! ```

pub mod entities;
pub mod pool;

// Re-export core types
pub use recs_core::*;

pub use entities::PgEntityStore;
pub use pool::{connect_with_retry, create_pool_with_config, PoolConfig};

/// Combined database context.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Entity store for embedding reads and writes.
    pub entities: PgEntityStore,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            entities: PgEntityStore::new(pool.clone()),
            pool,
        }
    }
}
