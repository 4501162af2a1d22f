//! Integration tests for the import service API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use uuid::Uuid;

use paindex_common::config::ServiceConfig;
use paindex_common::events::{BatchStatus, EventBus};
use paindex_common::Result;
use paindex_import::models::ImportBatch;
use paindex_import::object_store::MemoryObjectStore;
use paindex_import::store::{self, batches};
use paindex_import::wp::{WpCategory, WpPost, WpSource, WpTag};
use paindex_import::AppState;

struct EmptyWordPress;

#[async_trait::async_trait]
impl WpSource for EmptyWordPress {
    async fn list_categories(&self) -> Result<Vec<WpCategory>> {
        Ok(Vec::new())
    }

    async fn list_tags(&self) -> Result<Vec<WpTag>> {
        Ok(Vec::new())
    }

    async fn list_posts(&self) -> Result<Vec<WpPost>> {
        Ok(Vec::new())
    }

    async fn media_source_url(&self, _media_id: u64) -> Option<String> {
        None
    }

    async fn fetch_image(&self, url: &str) -> Result<(Vec<u8>, String)> {
        Err(paindex_common::Error::Http(format!("no image at {}", url)))
    }
}

/// Test helper: app with in-memory database and object store
async fn create_test_app() -> (axum::Router, sqlx::SqlitePool, Arc<MemoryObjectStore>) {
    let pool = store::init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let object_store = Arc::new(MemoryObjectStore::new());

    let state = AppState::new(
        pool.clone(),
        EventBus::new(100),
        ServiceConfig::default(),
        object_store.clone(),
        Arc::new(EmptyWordPress),
    );
    (paindex_import::build_router(state), pool, object_store)
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response is JSON")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn wait_for_terminal_import(
    pool: &sqlx::SqlitePool,
    batch_id: Uuid,
) -> paindex_import::models::ImportBatch {
    for _ in 0..100 {
        if let Some(batch) = batches::load_import_batch(pool, batch_id).await.unwrap() {
            if batch.is_terminal() {
                return batch;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("import batch {} never reached a terminal state", batch_id);
}

const CSV: &str = "\
name,full_address,city,state,postal_code,place_id,latitude,longitude
Clinic A,100 Main St,Austin,TX,78701,P1,30.27,-97.74
Clinic B,200 Oak Ave,Dallas,TX,75201,P2,32.78,-96.80
";

#[tokio::test]
async fn health_check_reports_ok() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "paindex-import");
}

#[tokio::test]
async fn preview_reports_format_and_first_rows() {
    let (app, _, object_store) = create_test_app().await;
    object_store.put("staging/clinics.csv", CSV.as_bytes().to_vec());

    let response = app
        .oneshot(post_json(
            "/import/preview",
            json!({"source_key": "staging/clinics.csv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["format"], "Scraper export (place IDs)");
    assert_eq!(body["total_rows"], 2);
    assert_eq!(body["preview"].as_array().unwrap().len(), 2);
    assert_eq!(body["preview"][0]["name"], "Clinic A");
    assert_eq!(body["validation"]["valid"], true);
}

#[tokio::test]
async fn preview_of_unrecognized_headers_reports_missing_per_format() {
    let (app, _, object_store) = create_test_app().await;
    object_store.put("staging/junk.csv", b"foo,bar\n1,2\n".to_vec());

    let response = app
        .oneshot(post_json(
            "/import/preview",
            json!({"source_key": "staging/junk.csv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["validation"]["valid"], false);
    assert!(body["format"].is_null());
    let missing = &body["validation"]["missing_headers"]["Scraper export (place IDs)"];
    assert!(missing
        .as_array()
        .unwrap()
        .iter()
        .any(|h| h == "place_id"));
}

#[tokio::test]
async fn start_import_runs_to_completion_in_background() {
    let (app, pool, object_store) = create_test_app().await;
    object_store.put("staging/clinics.csv", CSV.as_bytes().to_vec());

    let response = app
        .clone()
        .oneshot(post_json(
            "/import/start",
            json!({
                "source_key": "staging/clinics.csv",
                "source_file": "clinics.csv",
                "duplicate_handling": "skip"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let batch_id: Uuid = body["batch_id"].as_str().unwrap().parse().unwrap();
    assert_eq!(body["status"], "pending");

    let batch = wait_for_terminal_import(&pool, batch_id).await;
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.success, 2);

    // staged upload removed, clinics written
    assert!(!object_store.contains("staging/clinics.csv"));
    assert_eq!(store::clinics::count(&pool).await.unwrap(), 2);

    // batch record is visible through the API
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/import/batches/{}", batch_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn concurrent_import_start_is_conflict() {
    let (app, pool, _) = create_test_app().await;

    let mut running = ImportBatch::new("other.csv".to_string(), None);
    running.transition_to(BatchStatus::Processing);
    batches::save_import_batch(&pool, &running).await.unwrap();

    let response = app
        .oneshot(post_json(
            "/import/start",
            json!({"source_key": "staging/clinics.csv", "source_file": "clinics.csv"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn unknown_batch_is_not_found() {
    let (app, _, _) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/import/batches/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn migration_start_runs_to_completion() {
    let (app, pool, _) = create_test_app().await;

    let response = app
        .oneshot(post_json("/migration/start", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let batch_id: Uuid = body["batch_id"].as_str().unwrap().parse().unwrap();

    for _ in 0..100 {
        if let Some(batch) = batches::load_blog_batch(&pool, batch_id).await.unwrap() {
            if batch.is_terminal() {
                assert_eq!(batch.status, BatchStatus::Completed);
                assert_eq!(batch.posts_total, 0);
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("migration batch never reached a terminal state");
}
