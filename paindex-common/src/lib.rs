//! Shared library for Paindex services
//!
//! Common error type, configuration loading, the import event bus, SQLite
//! pool initialization, and SSE streaming helpers.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
