//! Embedding scheduler: in-process priority queue with bounded concurrency and
//! linear retry backoff.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value as JsonValue;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, error, info, instrument, warn};

use recs_core::defaults;
use recs_core::{
    linear_backoff, EmbeddingBackend, EntityKind, EntityStore, Error, Priority, Result,
    SchedulerStatus, TaskStatus,
};

use crate::handler::{TaskContext, TaskHandler};
use crate::pipeline::EmbeddingPipeline;
use crate::queue::PriorityQueue;
use crate::task::{Task, TaskId};

/// Configuration for the embedding scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of tasks processed at the same time.
    pub max_concurrent: usize,
    /// Base unit of the linear retry backoff.
    pub retry_delay: Duration,
    /// Retries after the first attempt before a task is dropped.
    pub max_retries: u32,
    /// Maximum number of tasks dispatched per scheduling pass.
    pub batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::SCHEDULER_MAX_CONCURRENT,
            retry_delay: Duration::from_millis(defaults::SCHEDULER_RETRY_DELAY_MS),
            max_retries: defaults::SCHEDULER_MAX_RETRIES,
            batch_size: defaults::SCHEDULER_BATCH_SIZE,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `EMBED_MAX_CONCURRENT` | `4` | Max tasks in flight |
    /// | `EMBED_RETRY_DELAY_MS` | `1000` | Backoff unit, multiplied by the attempt number |
    /// | `EMBED_MAX_RETRIES` | `3` | Retries before a task is dropped |
    /// | `EMBED_BATCH_SIZE` | `10` | Max tasks dispatched per pass |
    pub fn from_env() -> Self {
        let max_concurrent = std::env::var("EMBED_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::SCHEDULER_MAX_CONCURRENT)
            .max(1);

        let retry_delay_ms = std::env::var("EMBED_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::SCHEDULER_RETRY_DELAY_MS);

        let max_retries = std::env::var("EMBED_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::SCHEDULER_MAX_RETRIES);

        let batch_size = std::env::var("EMBED_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::SCHEDULER_BATCH_SIZE)
            .max(1);

        Self {
            max_concurrent,
            retry_delay: Duration::from_millis(retry_delay_ms),
            max_retries,
            batch_size,
        }
    }

    /// Set maximum concurrent tasks.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Set the backoff unit.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the per-pass dispatch limit.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Reject configurations the loop cannot make progress with.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::Config("max_concurrent must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Event emitted by the scheduler loop.
///
/// Attempt numbers are 1-based.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// A task was handed to a worker.
    TaskStarted {
        task_id: TaskId,
        entity_kind: EntityKind,
        entity_id: i64,
        attempt: u32,
    },
    /// The embedding for a task was persisted.
    TaskSucceeded {
        task_id: TaskId,
        entity_kind: EntityKind,
        entity_id: i64,
        attempt: u32,
    },
    /// An attempt failed and the task was re-queued behind a backoff.
    TaskRetrying {
        task_id: TaskId,
        entity_kind: EntityKind,
        entity_id: i64,
        attempt: u32,
        delay: Duration,
        error: String,
    },
    /// A task exhausted its retries and was dropped.
    TaskFailed {
        task_id: TaskId,
        entity_kind: EntityKind,
        entity_id: i64,
        attempts: u32,
        error: String,
    },
    /// The queue was cleared.
    Cleared { dropped: usize },
    /// The scheduler loop exited.
    SchedulerStopped,
}

#[derive(Debug, Default)]
struct SchedulerState {
    queue: PriorityQueue,
    /// Tasks dispatched in the current epoch whose outcome is pending.
    processing: usize,
    /// Bumped by `clear`; outcomes from older epochs are ignored.
    epoch: u64,
    closed: bool,
}

impl SchedulerState {
    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            queue_length: self.queue.len(),
            processing: self.processing,
            is_processing: self.processing > 0 || !self.queue.is_empty(),
        }
    }
}

/// State shared between the public handle and the loop task.
struct Shared {
    config: SchedulerConfig,
    state: Mutex<SchedulerState>,
    wake: Notify,
    events: broadcast::Sender<SchedulerEvent>,
}

impl Shared {
    // Critical sections never panic midway, so a poisoned lock still holds
    // consistent state.
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SchedulerEvent) {
        let _ = self.events.send(event);
    }
}

/// Outcome of one attempt, returned through the loop's `JoinSet`.
struct WorkerReport {
    task: Task,
    epoch: u64,
    result: Result<()>,
    elapsed: Duration,
}

/// Handle to a running embedding scheduler.
///
/// Cheap to clone; all clones drive the same queue and loop.
#[derive(Clone)]
pub struct EmbeddingScheduler {
    shared: Arc<Shared>,
    runner: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl EmbeddingScheduler {
    /// Start a scheduler that embeds entities from `store` with `backend`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(
        config: SchedulerConfig,
        store: Arc<dyn EntityStore>,
        backend: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        Self::start_with_handler(config, Arc::new(EmbeddingPipeline::new(store, backend)))
    }

    /// Start a scheduler that runs `handler` for each dispatched task.
    pub fn start_with_handler(
        config: SchedulerConfig,
        handler: Arc<dyn TaskHandler>,
    ) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            Error::Internal("Embedding scheduler must be started inside a Tokio runtime".into())
        })?;

        let (events, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(SchedulerState::default()),
            wake: Notify::new(),
            events,
        });

        let runner = runtime.spawn(run(shared.clone(), handler));

        Ok(Self {
            shared,
            runner: Arc::new(Mutex::new(Some(runner))),
        })
    }

    /// Queue an entity for embedding and return immediately.
    ///
    /// `Ok` means the task was accepted for scheduling, not that an embedding
    /// was produced. Execution failures are retried and, once exhausted,
    /// reported through [`SchedulerEvent::TaskFailed`] only.
    pub fn enqueue(
        &self,
        kind: EntityKind,
        entity_id: i64,
        payload: JsonValue,
        priority: Priority,
    ) -> Result<TaskId> {
        if entity_id <= 0 {
            return Err(Error::InvalidInput(format!(
                "entity id must be positive, got {}",
                entity_id
            )));
        }

        let task = Task::new(kind, entity_id, payload, priority, Instant::now());
        let task_id = task.id.clone();
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(Error::Job("Scheduler is shut down".into()));
            }
            state.queue.push(task);
        }
        self.shared.wake.notify_one();

        debug!(
            subsystem = "jobs",
            component = "scheduler",
            op = "enqueue",
            task_id = %task_id,
            entity_kind = %kind,
            entity_id,
            priority = %priority,
            "Task queued"
        );
        Ok(task_id)
    }

    /// String-typed variant of [`enqueue`](Self::enqueue) for callers holding
    /// raw request values.
    ///
    /// The kind must name a known entity kind; an unrecognized priority falls
    /// back to normal.
    pub fn enqueue_raw(
        &self,
        kind: &str,
        entity_id: i64,
        payload: JsonValue,
        priority: &str,
    ) -> Result<TaskId> {
        let kind = kind.parse::<EntityKind>().map_err(Error::InvalidInput)?;
        self.enqueue(kind, entity_id, payload, Priority::parse_lenient(priority))
    }

    /// Snapshot of queue length and in-flight count.
    pub fn status(&self) -> SchedulerStatus {
        self.shared.lock().status()
    }

    /// Drop every queued task and forget in-flight ones.
    ///
    /// Running workers are not cancelled; their outcomes are discarded when
    /// they arrive. The scheduler keeps accepting work afterwards.
    pub fn clear(&self) {
        let (dropped, abandoned) = {
            let mut state = self.shared.lock();
            let dropped = state.queue.clear();
            let abandoned = std::mem::take(&mut state.processing);
            state.epoch += 1;
            (dropped, abandoned)
        };

        info!(
            subsystem = "jobs",
            component = "scheduler",
            op = "clear",
            dropped,
            abandoned,
            "Scheduler queue cleared"
        );
        self.shared.emit(SchedulerEvent::Cleared { dropped });
    }

    /// Subscribe to scheduler events.
    pub fn events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Poll [`status`](Self::status) until nothing is queued or running.
    ///
    /// Returns `false` if work remains after `timeout`.
    pub async fn wait_until_idle(&self, poll: Duration, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.status().is_processing {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(poll).await;
        }
    }

    /// Stop accepting work and wait for in-flight workers to finish.
    ///
    /// Tasks still queued when the loop exits are dropped.
    pub async fn shutdown(&self) -> Result<()> {
        self.shared.lock().closed = true;
        self.shared.wake.notify_one();

        let runner = self
            .runner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runner) = runner {
            runner
                .await
                .map_err(|e| Error::Internal(format!("Scheduler loop failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Scheduler loop: dispatch eligible tasks within the concurrency budget,
/// then sleep until a worker finishes, work is enqueued, or a backoff expires.
#[instrument(skip_all, fields(subsystem = "jobs", component = "scheduler"))]
async fn run(shared: Arc<Shared>, handler: Arc<dyn TaskHandler>) {
    let config = shared.config.clone();
    info!(
        max_concurrent = config.max_concurrent,
        batch_size = config.batch_size,
        max_retries = config.max_retries,
        retry_delay_ms = config.retry_delay.as_millis() as u64,
        "Embedding scheduler started"
    );

    let mut workers: JoinSet<WorkerReport> = JoinSet::new();

    loop {
        let now = Instant::now();
        let (batch, epoch, wake_at, closed) = {
            let mut state = shared.lock();
            let mut batch = Vec::new();
            if !state.closed {
                let available = config
                    .max_concurrent
                    .saturating_sub(state.processing)
                    .min(config.batch_size);
                if available > 0 {
                    batch = state.queue.pop_eligible(now, available);
                }
                for task in batch.iter_mut() {
                    task.status = TaskStatus::Processing;
                }
                state.processing += batch.len();
            }

            // Only arm the backoff timer while a slot is free; otherwise the
            // next completion wakes the loop.
            let wake_at = if !state.closed && state.processing < config.max_concurrent {
                state.queue.next_eligible_at()
            } else {
                None
            };
            (batch, state.epoch, wake_at, state.closed)
        };

        if closed && workers.is_empty() {
            break;
        }

        if !batch.is_empty() {
            debug!(dispatched = batch.len(), in_flight = workers.len(), "Dispatching tasks");
        }
        for task in batch {
            dispatch(&mut workers, &shared, &handler, task, epoch);
        }

        tokio::select! {
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                match joined {
                    Ok(report) => complete(&shared, report),
                    Err(e) => error!(error = ?e, "Scheduler worker task failed"),
                }
            }
            _ = shared.wake.notified() => {}
            _ = sleep_until(wake_at.unwrap_or(now)), if wake_at.is_some() => {}
        }
    }

    let dropped = {
        let mut state = shared.lock();
        state.processing = 0;
        state.queue.clear()
    };
    if dropped > 0 {
        warn!(dropped, "Dropped queued tasks at shutdown");
    }

    shared.emit(SchedulerEvent::SchedulerStopped);
    info!("Embedding scheduler stopped");
}

/// Spawn a worker for `task`.
///
/// The handler runs in its own Tokio task so a panic surfaces as a
/// `JoinError` and is reported like any other failed attempt.
fn dispatch(
    workers: &mut JoinSet<WorkerReport>,
    shared: &Shared,
    handler: &Arc<dyn TaskHandler>,
    task: Task,
    epoch: u64,
) {
    let ctx = TaskContext::from_task(&task);
    debug!(
        task_id = %task.id,
        entity_kind = %task.entity_kind,
        entity_id = task.entity_id,
        priority = %task.priority,
        attempt = ctx.attempt,
        "Task dispatched"
    );
    shared.emit(SchedulerEvent::TaskStarted {
        task_id: task.id.clone(),
        entity_kind: task.entity_kind,
        entity_id: task.entity_id,
        attempt: ctx.attempt,
    });

    let handler = handler.clone();
    workers.spawn(async move {
        let start = Instant::now();
        let result = match tokio::spawn(async move { handler.execute(ctx).await }).await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("Worker panicked: {}", e))),
        };
        WorkerReport {
            task,
            epoch,
            result,
            elapsed: start.elapsed(),
        }
    });
}

/// Apply a worker outcome: drop on success, re-queue with backoff, or drop
/// once retries are exhausted.
fn complete(shared: &Shared, report: WorkerReport) {
    let WorkerReport {
        mut task,
        epoch,
        result,
        elapsed,
    } = report;
    let duration_ms = elapsed.as_millis() as u64;
    let config = &shared.config;

    let event = {
        let mut state = shared.lock();
        if epoch != state.epoch {
            debug!(task_id = %task.id, "Ignoring outcome of cleared task");
            return;
        }
        state.processing = state.processing.saturating_sub(1);

        match result {
            Ok(()) => {
                task.status = TaskStatus::Succeeded;
                info!(
                    task_id = %task.id,
                    entity_kind = %task.entity_kind,
                    entity_id = task.entity_id,
                    attempt = task.attempt + 1,
                    duration_ms,
                    "Task succeeded"
                );
                SchedulerEvent::TaskSucceeded {
                    task_id: task.id,
                    entity_kind: task.entity_kind,
                    entity_id: task.entity_id,
                    attempt: task.attempt + 1,
                }
            }
            Err(e) => {
                task.attempt += 1;
                if task.attempt > config.max_retries || state.closed || !e.is_retryable() {
                    task.status = TaskStatus::Failed;
                    if state.closed {
                        warn!(
                            task_id = %task.id,
                            entity_kind = %task.entity_kind,
                            entity_id = task.entity_id,
                            attempts = task.attempt,
                            error = %e,
                            "Task failed during shutdown, not retrying"
                        );
                    } else {
                        error!(
                            task_id = %task.id,
                            entity_kind = %task.entity_kind,
                            entity_id = task.entity_id,
                            attempts = task.attempt,
                            duration_ms,
                            error = %e,
                            "Task failed permanently"
                        );
                    }
                    SchedulerEvent::TaskFailed {
                        task_id: task.id,
                        entity_kind: task.entity_kind,
                        entity_id: task.entity_id,
                        attempts: task.attempt,
                        error: e.to_string(),
                    }
                } else {
                    let delay = linear_backoff(config.retry_delay, task.attempt);
                    task.status = TaskStatus::Queued;
                    task.next_eligible_at = Instant::now() + delay;
                    warn!(
                        task_id = %task.id,
                        entity_kind = %task.entity_kind,
                        entity_id = task.entity_id,
                        priority = %task.priority,
                        attempt = task.attempt,
                        delay_ms = delay.as_millis() as u64,
                        duration_ms,
                        error = %e,
                        "Task failed, retrying"
                    );
                    let event = SchedulerEvent::TaskRetrying {
                        task_id: task.id.clone(),
                        entity_kind: task.entity_kind,
                        entity_id: task.entity_id,
                        attempt: task.attempt,
                        delay,
                        error: e.to_string(),
                    };
                    state.queue.push(task);
                    event
                }
            }
        }
    };

    shared.emit(event);
}
