//! Shared data types for embedding scheduling.

use serde::{Deserialize, Serialize};

pub use pgvector::Vector;

/// Kind of user content that carries an embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A user's recommendation of a place or service.
    Recommendation,
    /// A user's annotation attached to a recommendation.
    Annotation,
}

impl EntityKind {
    /// All entity kinds, in the order bulk jobs process them.
    pub const ALL: [EntityKind; 2] = [EntityKind::Recommendation, EntityKind::Annotation];

    /// Stable lowercase name, used in task ids and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Recommendation => "recommendation",
            EntityKind::Annotation => "annotation",
        }
    }

    /// Table holding rows of this kind (and their `embedding` column).
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Recommendation => "recommendations",
            EntityKind::Annotation => "annotations",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "recommendation" => Ok(Self::Recommendation),
            "annotation" => Ok(Self::Annotation),
            _ => Err(format!("Invalid entity kind: {}", s)),
        }
    }
}

/// Scheduling priority of a task.
///
/// Ordering follows urgency, so `High > Normal > Low`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    /// Priorities from most to least urgent; the order the queue is scanned in.
    pub const DISPATCH_ORDER: [Priority; 3] = [Priority::High, Priority::Normal, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }

    /// Parse a priority, falling back to [`Priority::Normal`] on anything
    /// outside the closed set.
    ///
    /// Callers are internal producers, so an unrecognized value is treated as
    /// a default rather than rejected.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::debug!(priority = s, "Unrecognized priority, using normal");
            Priority::Normal
        })
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Lifecycle state of a scheduler task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

/// Point-in-time view of the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    /// Tasks waiting to be dispatched (excludes processing tasks).
    pub queue_length: usize,
    /// Tasks currently held by workers.
    pub processing: usize,
    /// True while any work is queued or in flight.
    pub is_processing: bool,
}
