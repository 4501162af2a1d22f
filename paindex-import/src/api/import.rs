//! CSV import API handlers

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::csv_import::parse_csv;
use crate::error::{ApiError, ApiResult};
use crate::models::ImportBatch;
use crate::pipeline::{BusSink, CsvImportConfig, CsvImportPipeline};
use crate::reconcile::DuplicateHandling;
use crate::store::batches;
use crate::transform::ClinicTransformer;
use crate::AppState;
use paindex_common::events::BatchStatus;

/// POST /import/preview request
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Object store key of the staged CSV file
    pub source_key: String,
}

/// POST /import/preview response
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub format: Option<String>,
    pub headers: Vec<String>,
    pub total_rows: u64,
    pub preview: Vec<BTreeMap<String, String>>,
    pub validation: PreviewValidation,
}

/// Validation verdict for a staged upload
#[derive(Debug, Serialize)]
pub struct PreviewValidation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Headers each candidate format was missing, when no format matched
    pub missing_headers: BTreeMap<String, Vec<String>>,
}

impl PreviewValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            missing_headers: BTreeMap::new(),
        }
    }
}

/// POST /import/start request
#[derive(Debug, Deserialize)]
pub struct StartImportRequest {
    /// Object store key of the staged CSV file
    pub source_key: String,
    /// Original filename, for the audit record
    pub source_file: String,
    #[serde(default)]
    pub duplicate_handling: DuplicateHandling,
    #[serde(default)]
    pub initiated_by: Option<String>,
}

/// POST /import/start response
#[derive(Debug, Serialize)]
pub struct StartImportResponse {
    pub batch_id: Uuid,
    pub status: BatchStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

/// POST /import/preview
///
/// Parse the staged file without writing anything: detected format, headers
/// and the first rows for operator confirmation.
pub async fn preview_import(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Json<PreviewResponse>> {
    use crate::csv_import::{CsvError, FormatError};

    let bytes = state.object_store.fetch(&request.source_key).await?;
    let text = String::from_utf8(bytes)
        .map_err(|e| ApiError::BadRequest(format!("CSV is not valid UTF-8: {}", e)))?;

    match parse_csv(&text) {
        Ok(parsed) => Ok(Json(PreviewResponse {
            format: Some(parsed.format.label().to_string()),
            headers: parsed.headers,
            total_rows: parsed.rows.len() as u64,
            preview: parsed.preview,
            validation: PreviewValidation::ok(),
        })),
        // An unrecognized header set is a validation verdict, not a request
        // error: tell the operator what each candidate format was missing.
        Err(CsvError::Format(FormatError::Unrecognized { candidates })) => {
            let missing_headers = candidates
                .into_iter()
                .map(|c| (c.format.label().to_string(), c.missing_headers))
                .collect();
            Ok(Json(PreviewResponse {
                format: None,
                headers: Vec::new(),
                total_rows: 0,
                preview: Vec::new(),
                validation: PreviewValidation {
                    valid: false,
                    errors: vec!["No supported CSV format matched the header row".to_string()],
                    warnings: Vec::new(),
                    missing_headers,
                },
            }))
        }
        Err(e) => Err(ApiError::BadRequest(e.to_string())),
    }
}

/// POST /import/start
///
/// Begin an import. Returns the batch ID immediately; progress streams over
/// `/import/events/{batch_id}` and the run continues in the background.
pub async fn start_import(
    State(state): State<AppState>,
    Json(request): Json<StartImportRequest>,
) -> ApiResult<Json<StartImportResponse>> {
    if request.source_key.trim().is_empty() {
        return Err(ApiError::BadRequest("source_key must not be empty".to_string()));
    }

    // One import at a time (409 Conflict)
    if batches::has_running_import_batch(&state.db).await? {
        return Err(ApiError::Conflict("Import already running".to_string()));
    }

    let batch = ImportBatch::new(request.source_file.clone(), request.initiated_by.clone());
    let response = StartImportResponse {
        batch_id: batch.batch_id,
        status: batch.status,
        started_at: batch.started_at,
    };
    batches::save_import_batch(&state.db, &batch).await?;

    tracing::info!(
        batch_id = %batch.batch_id,
        source = %request.source_file,
        policy = ?request.duplicate_handling,
        "Import batch accepted"
    );

    let pipeline = CsvImportPipeline::new(
        state.db.clone(),
        state.object_store.clone(),
        Arc::new(BusSink::new(state.event_bus.clone())),
        ClinicTransformer::new(),
        CsvImportConfig {
            duplicate_handling: request.duplicate_handling,
            chunk_size: state.config.import_chunk_size,
            error_report_cap: state.config.error_report_cap,
        },
    );
    tokio::spawn(async move {
        let outcome = pipeline.run(batch, &request.source_key).await;
        for warning in &outcome.cleanup_warnings {
            tracing::warn!(batch_id = %outcome.batch.batch_id, "{}", warning);
        }
    });

    Ok(Json(response))
}

/// GET /import/batches
pub async fn list_batches(State(state): State<AppState>) -> ApiResult<Json<Vec<ImportBatch>>> {
    Ok(Json(batches::list_import_batches(&state.db).await?))
}

/// GET /import/batches/{batch_id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> ApiResult<Json<ImportBatch>> {
    batches::load_import_batch(&state.db, batch_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Import batch not found: {}", batch_id)))
}

/// Build CSV import routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/preview", post(preview_import))
        .route("/import/start", post(start_import))
        .route("/import/batches", get(list_batches))
        .route("/import/batches/:batch_id", get(get_batch))
}
