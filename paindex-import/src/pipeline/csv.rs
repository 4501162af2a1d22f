//! CSV import orchestrator
//!
//! Runs one staged CSV file through fetch, parse, transform and
//! reconciliation, recording progress on the batch record and emitting
//! events through the progress sink. Only a setup failure (source fetch or
//! parse) fails the batch; row-level problems are recorded and the run
//! continues.

use sqlx::SqlitePool;
use std::sync::Arc;

use paindex_common::events::{BatchStatus, ImportEvent};
use paindex_common::{Error, Result};

use crate::csv_import::parse_csv;
use crate::models::ImportBatch;
use crate::object_store::ObjectStore;
use crate::reconcile::{reconcile_record, DuplicateHandling, RowOutcome};
use crate::store::batches;
use crate::transform::ClinicTransformer;

use super::progress::ProgressSink;

/// Tunables for one import run
#[derive(Debug, Clone)]
pub struct CsvImportConfig {
    pub duplicate_handling: DuplicateHandling,
    /// Rows reconciled between progress events and batch saves
    pub chunk_size: usize,
    /// Error entries included in the `complete` event payload
    pub error_report_cap: usize,
}

impl Default for CsvImportConfig {
    fn default() -> Self {
        Self {
            duplicate_handling: DuplicateHandling::default(),
            chunk_size: 100,
            error_report_cap: 50,
        }
    }
}

/// Terminal batch record plus any cleanup problems that did not affect it
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch: ImportBatch,
    /// Post-completion cleanup failures. The import result already stands;
    /// these need operator attention, not a retry.
    pub cleanup_warnings: Vec<String>,
}

pub struct CsvImportPipeline {
    pool: SqlitePool,
    object_store: Arc<dyn ObjectStore>,
    sink: Arc<dyn ProgressSink>,
    transformer: ClinicTransformer,
    config: CsvImportConfig,
}

impl CsvImportPipeline {
    pub fn new(
        pool: SqlitePool,
        object_store: Arc<dyn ObjectStore>,
        sink: Arc<dyn ProgressSink>,
        transformer: ClinicTransformer,
        config: CsvImportConfig,
    ) -> Self {
        Self {
            pool,
            object_store,
            sink,
            transformer,
            config,
        }
    }

    /// Run the import to a terminal state.
    ///
    /// Never returns an error: failures land on the batch record and in the
    /// event stream. The final `complete` or fatal `error` event is emitted
    /// only after the terminal batch record is durable, and is the last
    /// event of the run.
    pub async fn run(&self, mut batch: ImportBatch, source_key: &str) -> BatchOutcome {
        let batch_id = batch.batch_id;
        tracing::info!(batch_id = %batch_id, source = %batch.source_file, "CSV import started");

        let fatal = match self.run_inner(&mut batch, source_key).await {
            Ok(()) => {
                batch.transition_to(BatchStatus::Completed);
                None
            }
            Err(e) => {
                let message = e.to_string();
                batch.record_error(None, None, message.clone());
                batch.transition_to(BatchStatus::Failed);
                tracing::error!(batch_id = %batch_id, error = %message, "CSV import failed");
                Some(message)
            }
        };

        // Completion phase two: remove the staged upload. The import result
        // stands either way; a leftover object is an operator concern.
        let mut cleanup_warnings = Vec::new();
        if let Err(e) = self.object_store.delete(source_key).await {
            let warning = format!("staged file {} not removed: {}", source_key, e);
            tracing::warn!(batch_id = %batch_id, "{}", warning);
            cleanup_warnings.push(warning);
        }

        if let Err(e) = batches::save_import_batch(&self.pool, &batch).await {
            tracing::error!(batch_id = %batch_id, error = %e, "Failed to persist batch record");
        }

        match fatal {
            None => {
                tracing::info!(
                    batch_id = %batch_id,
                    success = batch.success,
                    errors = batch.errors,
                    skipped = batch.skipped,
                    "CSV import completed"
                );
                self.sink.emit(ImportEvent::Complete {
                    batch_id,
                    stats: batch.stats(self.config.error_report_cap),
                });
            }
            Some(message) => self.sink.emit(ImportEvent::Error {
                batch_id,
                row: None,
                item: None,
                message,
                fatal: true,
            }),
        }

        BatchOutcome {
            batch,
            cleanup_warnings,
        }
    }

    async fn run_inner(&self, batch: &mut ImportBatch, source_key: &str) -> Result<()> {
        self.set_status(batch, BatchStatus::Fetching).await?;

        let bytes = self.object_store.fetch(source_key).await?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Error::InvalidInput(format!("CSV is not valid UTF-8: {}", e)))?;
        let parsed = parse_csv(&text).map_err(|e| Error::InvalidInput(e.to_string()))?;

        batch.total = parsed.rows.len() as u64;
        tracing::info!(
            batch_id = %batch.batch_id,
            format = parsed.format.label(),
            rows = batch.total,
            "CSV parsed"
        );
        self.sink.emit(ImportEvent::Batch {
            batch_id: batch.batch_id,
            source: batch.source_file.clone(),
            total: batch.total,
        });

        let output = self.transformer.transform_rows(&parsed.rows).await;
        for skip in &output.skipped {
            batch.record_skip(skip.row_number, skip.reason.clone());
            self.sink.emit(ImportEvent::Error {
                batch_id: batch.batch_id,
                row: Some(skip.row_number),
                item: None,
                message: skip.reason.clone(),
                fatal: false,
            });
        }

        self.set_status(batch, BatchStatus::Processing).await?;

        let total_records = output.records.len() as u64;
        let mut processed = 0u64;
        for chunk in output.records.chunks(self.config.chunk_size.max(1)) {
            for (row_number, record) in chunk {
                match reconcile_record(&self.pool, record, self.config.duplicate_handling).await {
                    Ok((RowOutcome::SkippedDuplicate, _)) => batch.skipped += 1,
                    Ok(_) => batch.success += 1,
                    Err(e) => {
                        let message = e.to_string();
                        batch.record_error(Some(*row_number), None, message.clone());
                        self.sink.emit(ImportEvent::Error {
                            batch_id: batch.batch_id,
                            row: Some(*row_number),
                            item: None,
                            message,
                            fatal: false,
                        });
                    }
                }
                processed += 1;
            }

            self.sink.emit(ImportEvent::Progress {
                batch_id: batch.batch_id,
                phase: "processing".to_string(),
                current: processed,
                total: total_records,
                percentage: percentage(processed, total_records),
            });
            batches::save_import_batch(&self.pool, batch).await?;
        }

        Ok(())
    }

    async fn set_status(&self, batch: &mut ImportBatch, status: BatchStatus) -> Result<()> {
        batch.transition_to(status);
        batches::save_import_batch(&self.pool, batch).await?;
        self.sink.emit(ImportEvent::Status {
            batch_id: batch.batch_id,
            status,
        });
        Ok(())
    }
}

fn percentage(current: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        current as f64 / total as f64 * 100.0
    }
}
