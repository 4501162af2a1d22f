//! Batch orchestrators
//!
//! Both pipelines share the same shape: run to a terminal state, persist the
//! batch record at every transition, and close the event stream with a
//! `complete` or fatal `error` event emitted after the record is durable.

pub mod csv;
pub mod progress;
pub mod wordpress;

pub use csv::{BatchOutcome, CsvImportConfig, CsvImportPipeline};
pub use progress::{BusSink, CollectingSink, ProgressSink};
pub use wordpress::{MigrationOutcome, WpMigrationConfig, WpMigrationPipeline};
