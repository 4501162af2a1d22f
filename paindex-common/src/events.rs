//! Event types for the Paindex import pipelines
//!
//! Provides the shared progress-event vocabulary and the EventBus used to
//! fan events out to SSE clients. Events are emitted by the batch
//! orchestrators in processing order; the `complete` (or fatal `error`)
//! event for a batch is always the last event of that batch's run.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Batch lifecycle status
///
/// Terminal states (`Completed`, `Failed`) are final; a fresh batch must be
/// started to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    /// Accepted, not yet running
    Pending,
    /// Retrieving source data (staged CSV or remote CMS pages)
    Fetching,
    /// Per-row / per-item processing
    Processing,
    /// Finished; counts are final
    Completed,
    /// Setup failure stopped the whole batch
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Parse the lowercase database representation
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "pending" => Some(BatchStatus::Pending),
            "fetching" => Some(BatchStatus::Fetching),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "failed" => Some(BatchStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::Fetching => write!(f, "fetching"),
            BatchStatus::Processing => write!(f, "processing"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One structured error entry, recorded on the batch and streamed to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorEntry {
    /// 1-based CSV row number, when the error is row-scoped
    pub row: Option<u64>,
    /// Item identity (title or external ID) for migration errors
    pub item: Option<String>,
    pub message: String,
}

/// Final statistics reported on the `complete` event and persisted on the batch
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BatchStats {
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub skipped: u64,
    /// Capped error list (the full list lives on the batch record)
    pub error_entries: Vec<ErrorEntry>,
}

/// Progress events broadcast during a pipeline run
///
/// Serialized form is the SSE data payload; `event_type()` is the SSE event
/// name. Every event carries the batch ID so one stream can be filtered per
/// batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    /// Batch status transition
    Status {
        batch_id: Uuid,
        status: BatchStatus,
    },

    /// Batch accepted: identity and totals for the progress UI
    Batch {
        batch_id: Uuid,
        source: String,
        total: u64,
    },

    /// Numeric progress within the current phase
    Progress {
        batch_id: Uuid,
        phase: String,
        current: u64,
        total: u64,
        percentage: f64,
    },

    /// Per-row or batch-level error. `fatal: true` means the batch stopped
    /// and this is the stream's final event.
    Error {
        batch_id: Uuid,
        row: Option<u64>,
        item: Option<String>,
        message: String,
        fatal: bool,
    },

    /// Final summary; always the last event of a successful run
    Complete {
        batch_id: Uuid,
        stats: BatchStats,
    },

    /// Migration: post already imported, left untouched
    PostSkipped {
        batch_id: Uuid,
        wp_id: u64,
        title: String,
    },

    /// Migration: post imported
    PostComplete {
        batch_id: Uuid,
        wp_id: u64,
        title: String,
        slug: String,
    },

    /// Migration: post failed, batch continues
    PostError {
        batch_id: Uuid,
        wp_id: u64,
        title: String,
        message: String,
    },

    /// Migration: one image migrated (or left at its original URL on failure)
    Image {
        batch_id: Uuid,
        source_url: String,
        migrated_url: Option<String>,
    },
}

impl ImportEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            ImportEvent::Status { .. } => "status",
            ImportEvent::Batch { .. } => "batch",
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::Error { .. } => "error",
            ImportEvent::Complete { .. } => "complete",
            ImportEvent::PostSkipped { .. } => "post_skipped",
            ImportEvent::PostComplete { .. } => "post_complete",
            ImportEvent::PostError { .. } => "post_error",
            ImportEvent::Image { .. } => "image",
        }
    }

    /// Batch this event belongs to
    pub fn batch_id(&self) -> Uuid {
        match self {
            ImportEvent::Status { batch_id, .. }
            | ImportEvent::Batch { batch_id, .. }
            | ImportEvent::Progress { batch_id, .. }
            | ImportEvent::Error { batch_id, .. }
            | ImportEvent::Complete { batch_id, .. }
            | ImportEvent::PostSkipped { batch_id, .. }
            | ImportEvent::PostComplete { batch_id, .. }
            | ImportEvent::PostError { batch_id, .. }
            | ImportEvent::Image { batch_id, .. } => *batch_id,
        }
    }

    /// True when this is the last event a batch will emit
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ImportEvent::Complete { .. } | ImportEvent::Error { fatal: true, .. }
        )
    }
}

/// Broadcast bus connecting pipeline orchestrators to SSE clients
///
/// A send with no subscribers is a no-op, so pipelines run to completion
/// whether or not anyone is watching.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event. Returns the receiver count; zero receivers is normal.
    pub fn emit(&self, event: ImportEvent) -> usize {
        match self.tx.send(event) {
            Ok(count) => count,
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_sse_vocabulary() {
        let batch_id = Uuid::new_v4();
        let event = ImportEvent::Progress {
            batch_id,
            phase: "processing".to_string(),
            current: 100,
            total: 250,
            percentage: 40.0,
        };
        assert_eq!(event.event_type(), "progress");
        assert_eq!(event.batch_id(), batch_id);
        assert!(!event.is_final());
    }

    #[test]
    fn complete_and_fatal_error_are_final() {
        let batch_id = Uuid::new_v4();
        assert!(ImportEvent::Complete {
            batch_id,
            stats: BatchStats::default(),
        }
        .is_final());

        assert!(ImportEvent::Error {
            batch_id,
            row: None,
            item: None,
            message: "cannot fetch source".to_string(),
            fatal: true,
        }
        .is_final());

        assert!(!ImportEvent::Error {
            batch_id,
            row: Some(7),
            item: None,
            message: "bad row".to_string(),
            fatal: false,
        }
        .is_final());
    }

    #[test]
    fn serialized_events_are_tagged() {
        let event = ImportEvent::Status {
            batch_id: Uuid::new_v4(),
            status: BatchStatus::Processing,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["status"], "processing");
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_noop() {
        let bus = EventBus::new(16);
        let count = bus.emit(ImportEvent::Status {
            batch_id: Uuid::new_v4(),
            status: BatchStatus::Pending,
        });
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        for current in 1..=3u64 {
            bus.emit(ImportEvent::Progress {
                batch_id,
                phase: "processing".to_string(),
                current,
                total: 3,
                percentage: current as f64 / 3.0 * 100.0,
            });
        }

        for expected in 1..=3u64 {
            match rx.recv().await.unwrap() {
                ImportEvent::Progress { current, .. } => assert_eq!(current, expected),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }
}
