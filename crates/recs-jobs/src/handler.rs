//! Task handler seam between the scheduler loop and the work it dispatches.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use recs_core::{EntityKind, Result};

use crate::task::{Task, TaskId};

/// Read-only view of a task handed to a handler for one attempt.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task_id: TaskId,
    pub entity_kind: EntityKind,
    pub entity_id: i64,
    pub payload: Arc<JsonValue>,
    /// 1-based number of this attempt.
    pub attempt: u32,
}

impl TaskContext {
    /// Snapshot the fields of `task` a handler may read.
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            entity_kind: task.entity_kind,
            entity_id: task.entity_id,
            payload: task.payload.clone(),
            attempt: task.attempt + 1,
        }
    }

    /// The enqueue-time payload.
    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }
}

/// Work executed for each dispatched task.
///
/// Handlers report the outcome of one attempt and never touch scheduler
/// state; retries and terminal failure are decided by the loop.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, ctx: TaskContext) -> Result<()>;
}
