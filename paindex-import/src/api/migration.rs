//! Blog migration API handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::BlogImportBatch;
use crate::pipeline::{BusSink, WpMigrationConfig, WpMigrationPipeline};
use crate::store::batches;
use crate::AppState;
use paindex_common::events::BatchStatus;

fn default_true() -> bool {
    true
}

/// POST /migration/start request
#[derive(Debug, Deserialize)]
pub struct StartMigrationRequest {
    /// Leave posts that were already migrated untouched
    #[serde(default = "default_true")]
    pub skip_existing: bool,
    /// Copy referenced images into the object store
    #[serde(default = "default_true")]
    pub migrate_images: bool,
    #[serde(default)]
    pub initiated_by: Option<String>,
}

/// POST /migration/start response
#[derive(Debug, Serialize)]
pub struct StartMigrationResponse {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// POST /migration/start
///
/// Begin a blog migration. Same contract as the CSV import: the batch ID
/// comes back immediately and progress streams over
/// `/migration/events/{batch_id}`.
pub async fn start_migration(
    State(state): State<AppState>,
    Json(request): Json<StartMigrationRequest>,
) -> ApiResult<Json<StartMigrationResponse>> {
    // One migration at a time (409 Conflict)
    if batches::has_running_blog_batch(&state.db).await? {
        return Err(ApiError::Conflict("Migration already running".to_string()));
    }

    let batch = BlogImportBatch::new(request.initiated_by.clone());
    let response = StartMigrationResponse {
        batch_id: batch.batch_id,
        status: batch.status,
        started_at: batch.started_at,
    };
    batches::save_blog_batch(&state.db, &batch).await?;

    tracing::info!(
        batch_id = %batch.batch_id,
        skip_existing = request.skip_existing,
        migrate_images = request.migrate_images,
        "Blog migration batch accepted"
    );

    let pipeline = WpMigrationPipeline::new(
        state.db.clone(),
        state.wp_source.clone(),
        state.object_store.clone(),
        Arc::new(BusSink::new(state.event_bus.clone())),
        WpMigrationConfig {
            skip_existing: request.skip_existing,
            migrate_images: request.migrate_images,
            error_report_cap: state.config.error_report_cap,
        },
    );
    tokio::spawn(async move {
        pipeline.run(batch).await;
    });

    Ok(Json(response))
}

/// GET /migration/batches
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogImportBatch>>> {
    Ok(Json(batches::list_blog_batches(&state.db).await?))
}

/// GET /migration/batches/{batch_id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<BlogImportBatch>> {
    batches::load_blog_batch(&state.db, batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Migration batch not found: {}", batch_id)))
}

/// Build blog migration routes
pub fn migration_routes() -> Router<AppState> {
    Router::new()
        .route("/migration/start", post(start_migration))
        .route("/migration/batches", get(list_batches))
        .route("/migration/batches/:batch_id", get(get_batch))
}
