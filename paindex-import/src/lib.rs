//! paindex-import - Batch import and reconciliation service
//!
//! Imports clinic directory CSV files and migrates a WordPress blog into the
//! local database, streaming progress to admin clients over SSE and keeping
//! a durable audit record per batch.

pub mod api;
pub mod csv_import;
pub mod error;
pub mod models;
pub mod object_store;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod transform;
pub mod wp;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::object_store::ObjectStore;
use crate::wp::WpSource;
use paindex_common::config::ServiceConfig;
use paindex_common::events::EventBus;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Staged uploads and migrated images
    pub object_store: Arc<dyn ObjectStore>,
    /// WordPress site being migrated
    pub wp_source: Arc<dyn WpSource>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        config: ServiceConfig,
        object_store: Arc<dyn ObjectStore>,
        wp_source: Arc<dyn WpSource>,
    ) -> Self {
        Self {
            db,
            event_bus,
            config: Arc::new(config),
            object_store,
            wp_source,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::migration_routes())
        .merge(api::sse_routes())
        .merge(api::health_routes())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}
