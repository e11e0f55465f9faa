//! # recs-jobs
//!
//! In-process embedding task scheduler for recs.
//!
//! This crate provides:
//! - Priority-ordered task queueing (high, normal, low; FIFO within a level)
//! - Bounded concurrent workers with linear retry backoff
//! - Status snapshots, queue clearing and lifecycle events via broadcast channels
//! - Bulk regeneration producers
//!
//! ## Example
//!
//! ```ignore
//! use recs_jobs::{EmbeddingScheduler, SchedulerConfig};
//! use recs_core::{EntityKind, Priority};
//!
//! let scheduler = EmbeddingScheduler::start(SchedulerConfig::from_env(), store, backend)?;
//!
//! let task_id = scheduler.enqueue(
//!     EntityKind::Recommendation,
//!     42,
//!     serde_json::json!({ "place_name": "Tartine", "category": "bakery" }),
//!     Priority::High,
//! )?;
//!
//! // Listen for events
//! let mut events = scheduler.events();
//! while let Ok(event) = events.recv().await {
//!     println!("Event: {:?}", event);
//! }
//!
//! // Graceful shutdown
//! scheduler.shutdown().await?;
//! ```

pub mod handler;
pub mod pipeline;
pub mod queue;
pub mod regenerate;
pub mod scheduler;
pub mod task;

// Re-export core types
pub use recs_core::*;

pub use handler::{TaskContext, TaskHandler};
pub use pipeline::{compose_text, EmbeddingPipeline};
pub use queue::PriorityQueue;
pub use regenerate::{regenerate, RegenerateMode, RegenerationReport};
pub use scheduler::{EmbeddingScheduler, SchedulerConfig, SchedulerEvent};
pub use task::{task_id, Task, TaskId};
