//! Centralized default constants for the recs embedding pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates and the embedder binary reference these constants instead of
//! defining their own magic numbers.

// =============================================================================
// EMBEDDING
// =============================================================================

/// Default embedding model name (Ollama).
pub const EMBED_MODEL: &str = "nomic-embed-text";

/// Default embedding vector dimension for nomic-embed-text.
pub const EMBED_DIMENSION: usize = 768;

/// Default Ollama API endpoint.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// HTTP timeout for a single embedding request (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Embedding calls slower than this are logged as slow (milliseconds).
pub const EMBED_SLOW_THRESHOLD_MS: u64 = 5000;

// =============================================================================
// SCHEDULER
// =============================================================================

/// Maximum number of tasks processed at the same time.
pub const SCHEDULER_MAX_CONCURRENT: usize = 4;

/// Base unit of the linear retry backoff (milliseconds).
pub const SCHEDULER_RETRY_DELAY_MS: u64 = 1000;

/// Retries after the initial attempt before a task is dropped.
pub const SCHEDULER_MAX_RETRIES: u32 = 3;

/// Maximum number of tasks dispatched in a single scheduling pass.
pub const SCHEDULER_BATCH_SIZE: usize = 10;

/// Capacity of the scheduler event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// DATABASE
// =============================================================================

/// Attempts made to establish the connection pool at startup.
pub const DB_CONNECT_RETRIES: u32 = 5;

/// Base unit of the linear connect backoff (milliseconds).
pub const DB_CONNECT_RETRY_DELAY_MS: u64 = 1000;

// =============================================================================
// REGENERATION
// =============================================================================

/// Upper bound on how long a regeneration run waits for the queue to drain.
pub const REGENERATE_TIMEOUT_SECS: u64 = 3600;

/// Interval between status polls while waiting for the queue to drain.
pub const REGENERATE_POLL_INTERVAL_MS: u64 = 500;
