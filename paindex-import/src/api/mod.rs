//! HTTP API for the import service

pub mod health;
pub mod import;
pub mod migration;
pub mod sse;

pub use health::health_routes;
pub use import::import_routes;
pub use migration::migration_routes;
pub use sse::sse_routes;
