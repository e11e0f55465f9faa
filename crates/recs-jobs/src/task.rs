//! Scheduler task model.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::time::Instant;

use recs_core::{EntityKind, Priority, TaskStatus};

/// Identifier returned by enqueue, `{kind}-{entity_id}-{unix_millis}`.
///
/// Two enqueues of the same entity within one millisecond share an id; ids
/// are for correlating log lines, not for de-duplication.
pub type TaskId = String;

/// Build the task id for an entity enqueued at `enqueued_at`.
pub fn task_id(kind: EntityKind, entity_id: i64, enqueued_at: DateTime<Utc>) -> TaskId {
    format!("{}-{}-{}", kind, entity_id, enqueued_at.timestamp_millis())
}

/// One unit of embedding work for a single entity.
///
/// The identity fields and payload never change after enqueue; `attempt`,
/// `status` and `next_eligible_at` are only touched by the scheduler loop.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    /// Snapshot given at enqueue time, possibly partial.
    pub payload: Arc<JsonValue>,
    pub priority: Priority,
    /// Execution attempts that have completed with an error; the loop bumps
    /// it when an attempt fails, so the running attempt is `attempt + 1`.
    pub attempt: u32,
    pub status: TaskStatus,
    /// The task must not be dispatched before this instant.
    pub next_eligible_at: Instant,
    pub enqueued_at: DateTime<Utc>,
}

impl Task {
    /// Create a queued task that is eligible immediately.
    pub fn new(
        entity_kind: EntityKind,
        entity_id: i64,
        payload: JsonValue,
        priority: Priority,
        now: Instant,
    ) -> Self {
        let enqueued_at = Utc::now();
        Self {
            id: task_id(entity_kind, entity_id, enqueued_at),
            entity_kind,
            entity_id,
            payload: Arc::new(payload),
            priority,
            attempt: 0,
            status: TaskStatus::Queued,
            next_eligible_at: now,
            enqueued_at,
        }
    }

    /// Whether the task's backoff (if any) has elapsed.
    pub fn is_eligible(&self, now: Instant) -> bool {
        self.next_eligible_at <= now
    }
}
