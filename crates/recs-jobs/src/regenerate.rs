//! Bulk regeneration: enqueue every entity of a kind at low priority.

use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use recs_core::{EntityKind, EntityStore, Priority, Result};

use crate::scheduler::EmbeddingScheduler;

/// Which entities a regeneration run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegenerateMode {
    /// Every row, replacing existing embeddings.
    #[default]
    All,
    /// Only rows that have no embedding yet.
    MissingOnly,
}

impl RegenerateMode {
    fn only_missing(self) -> bool {
        matches!(self, RegenerateMode::MissingOnly)
    }
}

/// Admission counts for one regeneration run.
///
/// `admitted` counts tasks accepted by the scheduler, not embeddings written;
/// failures after admission show up in the scheduler's events and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegenerationReport {
    pub kind: EntityKind,
    pub total: usize,
    pub admitted: usize,
    pub rejected: usize,
}

/// Enqueue embedding tasks for every entity of `kind` selected by `mode`.
///
/// Tasks carry only `{ "id": .. }` so workers fetch the current row when
/// they run.
#[instrument(skip(scheduler, store), fields(subsystem = "jobs", component = "regenerate"))]
pub async fn regenerate(
    scheduler: &EmbeddingScheduler,
    store: &dyn EntityStore,
    kind: EntityKind,
    mode: RegenerateMode,
) -> Result<RegenerationReport> {
    let ids = store.list_ids(kind, mode.only_missing()).await?;

    let mut report = RegenerationReport {
        kind,
        total: ids.len(),
        admitted: 0,
        rejected: 0,
    };

    for id in ids {
        match scheduler.enqueue(kind, id, json!({ "id": id }), Priority::Low) {
            Ok(_) => report.admitted += 1,
            Err(e) => {
                warn!(entity_id = id, error = %e, "Regeneration task rejected");
                report.rejected += 1;
            }
        }
    }

    info!(
        total = report.total,
        admitted = report.admitted,
        rejected = report.rejected,
        "Regeneration tasks queued"
    );
    Ok(report)
}
