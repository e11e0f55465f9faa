//! Pending-task queue ordered by priority, then enqueue order.

use std::collections::VecDeque;

use tokio::time::Instant;

use recs_core::Priority;

use crate::task::Task;

/// Queued tasks in one FIFO bucket per priority.
///
/// Not synchronized; the scheduler keeps it inside its state mutex.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    /// Indexed by [`bucket_index`]: high, normal, low.
    buckets: [VecDeque<Task>; 3],
}

fn bucket_index(priority: Priority) -> usize {
    match priority {
        Priority::High => 0,
        Priority::Normal => 1,
        Priority::Low => 2,
    }
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task to the tail of its priority bucket.
    pub fn push(&mut self, task: Task) {
        self.buckets[bucket_index(task.priority)].push_back(task);
    }

    /// Remove and return up to `limit` tasks eligible at `now`.
    ///
    /// Buckets are scanned from high to low priority, each front to back.
    /// Tasks still backing off are skipped in place, so they never hold up
    /// eligible tasks behind them or in lower buckets.
    pub fn pop_eligible(&mut self, now: Instant, limit: usize) -> Vec<Task> {
        let mut batch = Vec::new();

        for bucket in self.buckets.iter_mut() {
            let mut i = 0;
            while i < bucket.len() && batch.len() < limit {
                if bucket[i].is_eligible(now) {
                    if let Some(task) = bucket.remove(i) {
                        batch.push(task);
                    }
                } else {
                    i += 1;
                }
            }
            if batch.len() >= limit {
                break;
            }
        }

        batch
    }

    /// Earliest instant at which any queued task becomes eligible.
    pub fn next_eligible_at(&self) -> Option<Instant> {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter())
            .map(|task| task.next_eligible_at)
            .min()
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(VecDeque::is_empty)
    }

    /// Drop every queued task, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.len();
        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        dropped
    }
}
