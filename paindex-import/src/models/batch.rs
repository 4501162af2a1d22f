//! Import batch audit records
//!
//! A batch is one upload-to-completion run of a pipeline, persisted as the
//! durable audit trail. Status progresses
//! `pending → fetching → processing → completed|failed`; terminal states are
//! final and a fresh batch must be started to retry.

use chrono::{DateTime, Utc};
use paindex_common::events::{BatchStats, BatchStatus, ErrorEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// CSV import batch record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: Uuid,
    /// Original filename of the uploaded CSV
    pub source_file: String,
    pub status: BatchStatus,
    pub total: u64,
    pub success: u64,
    pub errors: u64,
    pub skipped: u64,
    /// Structured per-row errors, in processing order
    pub error_entries: Vec<ErrorEntry>,
    /// Identity of the admin who started the import
    pub initiated_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportBatch {
    pub fn new(source_file: String, initiated_by: Option<String>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            source_file,
            status: BatchStatus::Pending,
            total: 0,
            success: 0,
            errors: 0,
            skipped: 0,
            error_entries: Vec::new(),
            initiated_by,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Transition to a new status. Terminal transitions stamp `completed_at`.
    pub fn transition_to(&mut self, status: BatchStatus) {
        tracing::debug!(
            batch_id = %self.batch_id,
            old = %self.status,
            new = %status,
            "Batch status transition"
        );
        self.status = status;
        if status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn record_error(&mut self, row: Option<u64>, item: Option<String>, message: String) {
        self.errors += 1;
        self.error_entries.push(ErrorEntry { row, item, message });
    }

    /// Record a row rejected before reconciliation. Counts against `skipped`,
    /// not `errors`; the reason still lands in the entry list for the audit
    /// trail.
    pub fn record_skip(&mut self, row: u64, reason: String) {
        self.skipped += 1;
        self.error_entries.push(ErrorEntry {
            row: Some(row),
            item: None,
            message: reason,
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Summary statistics with the error list capped at `cap` entries
    pub fn stats(&self, cap: usize) -> BatchStats {
        BatchStats {
            total: self.total,
            success: self.success,
            errors: self.errors,
            skipped: self.skipped,
            error_entries: self.error_entries.iter().take(cap).cloned().collect(),
        }
    }
}

/// One old-slug to new-path redirect produced by the blog migration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Redirect {
    pub from_slug: String,
    pub to_path: String,
}

/// Blog migration batch record
///
/// Same audit-trail role as [`ImportBatch`], plus the image URL remapping
/// table and generated redirect list the hosting layer applies afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogImportBatch {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub posts_total: u64,
    pub posts_success: u64,
    pub posts_skipped: u64,
    pub posts_errors: u64,
    /// old image URL → migrated URL
    pub image_map: std::collections::HashMap<String, String>,
    pub redirects: Vec<Redirect>,
    pub error_entries: Vec<ErrorEntry>,
    pub initiated_by: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl BlogImportBatch {
    pub fn new(initiated_by: Option<String>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            status: BatchStatus::Pending,
            posts_total: 0,
            posts_success: 0,
            posts_skipped: 0,
            posts_errors: 0,
            image_map: std::collections::HashMap::new(),
            redirects: Vec::new(),
            error_entries: Vec::new(),
            initiated_by,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn transition_to(&mut self, status: BatchStatus) {
        tracing::debug!(
            batch_id = %self.batch_id,
            old = %self.status,
            new = %status,
            "Blog batch status transition"
        );
        self.status = status;
        if status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub fn record_error(&mut self, wp_id: u64, title: &str, message: String) {
        self.posts_errors += 1;
        self.error_entries.push(ErrorEntry {
            row: None,
            item: Some(format!("{} (wp_id {})", title, wp_id)),
            message,
        });
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn stats(&self, cap: usize) -> BatchStats {
        BatchStats {
            total: self.posts_total,
            success: self.posts_success,
            errors: self.posts_errors,
            skipped: self.posts_skipped,
            error_entries: self.error_entries.iter().take(cap).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_transition_stamps_completed_at_once() {
        let mut batch = ImportBatch::new("clinics.csv".to_string(), None);
        assert!(batch.completed_at.is_none());

        batch.transition_to(BatchStatus::Fetching);
        batch.transition_to(BatchStatus::Processing);
        assert!(batch.completed_at.is_none());

        batch.transition_to(BatchStatus::Completed);
        let stamped = batch.completed_at.expect("completed_at set");

        // A second terminal transition must not move the timestamp
        batch.transition_to(BatchStatus::Completed);
        assert_eq!(batch.completed_at, Some(stamped));
        assert!(batch.is_terminal());
    }

    #[test]
    fn stats_cap_limits_error_entries() {
        let mut batch = ImportBatch::new("clinics.csv".to_string(), None);
        for row in 0..80 {
            batch.record_error(Some(row), None, format!("row {} failed", row));
        }
        let stats = batch.stats(50);
        assert_eq!(stats.errors, 80);
        assert_eq!(stats.error_entries.len(), 50);
        assert_eq!(stats.error_entries[0].row, Some(0));
    }
}
