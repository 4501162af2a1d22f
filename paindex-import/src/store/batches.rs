//! Batch audit record persistence
//!
//! Batches are saved at every status transition, so a crash mid-run leaves a
//! record in its last known state rather than losing the run entirely.

use paindex_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BlogImportBatch, ImportBatch};
use paindex_common::events::BatchStatus;

/// Insert or update a CSV import batch record
pub async fn save_import_batch(pool: &SqlitePool, batch: &ImportBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_batches (
            batch_id, source_file, status, total, success, errors, skipped,
            error_entries, initiated_by, started_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(batch_id) DO UPDATE SET
            status = excluded.status,
            total = excluded.total,
            success = excluded.success,
            errors = excluded.errors,
            skipped = excluded.skipped,
            error_entries = excluded.error_entries,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(batch.batch_id.to_string())
    .bind(&batch.source_file)
    .bind(batch.status.to_string())
    .bind(batch.total as i64)
    .bind(batch.success as i64)
    .bind(batch.errors as i64)
    .bind(batch.skipped as i64)
    .bind(to_json(&batch.error_entries)?)
    .bind(&batch.initiated_by)
    .bind(batch.started_at.to_rfc3339())
    .bind(batch.completed_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_import_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<ImportBatch>> {
    let row = sqlx::query(
        r#"
        SELECT batch_id, source_file, status, total, success, errors, skipped,
               error_entries, initiated_by, started_at, completed_at
        FROM import_batches WHERE batch_id = ?
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(import_batch_from_row).transpose()
}

/// All CSV import batches, newest first
pub async fn list_import_batches(pool: &SqlitePool) -> Result<Vec<ImportBatch>> {
    let rows = sqlx::query(
        r#"
        SELECT batch_id, source_file, status, total, success, errors, skipped,
               error_entries, initiated_by, started_at, completed_at
        FROM import_batches ORDER BY started_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(import_batch_from_row).collect()
}

/// True when any CSV import batch is in a non-terminal state
pub async fn has_running_import_batch(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM import_batches WHERE status NOT IN ('completed', 'failed')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Insert or update a blog migration batch record
pub async fn save_blog_batch(pool: &SqlitePool, batch: &BlogImportBatch) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO blog_import_batches (
            batch_id, status, posts_total, posts_success, posts_skipped,
            posts_errors, image_map, redirects, error_entries, initiated_by,
            started_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(batch_id) DO UPDATE SET
            status = excluded.status,
            posts_total = excluded.posts_total,
            posts_success = excluded.posts_success,
            posts_skipped = excluded.posts_skipped,
            posts_errors = excluded.posts_errors,
            image_map = excluded.image_map,
            redirects = excluded.redirects,
            error_entries = excluded.error_entries,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(batch.batch_id.to_string())
    .bind(batch.status.to_string())
    .bind(batch.posts_total as i64)
    .bind(batch.posts_success as i64)
    .bind(batch.posts_skipped as i64)
    .bind(batch.posts_errors as i64)
    .bind(to_json(&batch.image_map)?)
    .bind(to_json(&batch.redirects)?)
    .bind(to_json(&batch.error_entries)?)
    .bind(&batch.initiated_by)
    .bind(batch.started_at.to_rfc3339())
    .bind(batch.completed_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn load_blog_batch(pool: &SqlitePool, batch_id: Uuid) -> Result<Option<BlogImportBatch>> {
    let row = sqlx::query(
        r#"
        SELECT batch_id, status, posts_total, posts_success, posts_skipped,
               posts_errors, image_map, redirects, error_entries, initiated_by,
               started_at, completed_at
        FROM blog_import_batches WHERE batch_id = ?
        "#,
    )
    .bind(batch_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(blog_batch_from_row).transpose()
}

/// All blog migration batches, newest first
pub async fn list_blog_batches(pool: &SqlitePool) -> Result<Vec<BlogImportBatch>> {
    let rows = sqlx::query(
        r#"
        SELECT batch_id, status, posts_total, posts_success, posts_skipped,
               posts_errors, image_map, redirects, error_entries, initiated_by,
               started_at, completed_at
        FROM blog_import_batches ORDER BY started_at DESC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(blog_batch_from_row).collect()
}

/// True when any blog migration batch is in a non-terminal state
pub async fn has_running_blog_batch(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM blog_import_batches WHERE status NOT IN ('completed', 'failed')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

fn import_batch_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ImportBatch> {
    let batch_id: String = row.get("batch_id");
    let status: String = row.get("status");
    let error_entries: String = row.get("error_entries");
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let total: i64 = row.get("total");
    let success: i64 = row.get("success");
    let errors: i64 = row.get("errors");
    let skipped: i64 = row.get("skipped");

    Ok(ImportBatch {
        batch_id: parse_uuid(&batch_id)?,
        source_file: row.get("source_file"),
        status: parse_status(&status)?,
        total: total as u64,
        success: success as u64,
        errors: errors as u64,
        skipped: skipped as u64,
        error_entries: from_json(&error_entries)?,
        initiated_by: row.get("initiated_by"),
        started_at: parse_timestamp(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn blog_batch_from_row(row: sqlx::sqlite::SqliteRow) -> Result<BlogImportBatch> {
    let batch_id: String = row.get("batch_id");
    let status: String = row.get("status");
    let image_map: String = row.get("image_map");
    let redirects: String = row.get("redirects");
    let error_entries: String = row.get("error_entries");
    let started_at: String = row.get("started_at");
    let completed_at: Option<String> = row.get("completed_at");
    let posts_total: i64 = row.get("posts_total");
    let posts_success: i64 = row.get("posts_success");
    let posts_skipped: i64 = row.get("posts_skipped");
    let posts_errors: i64 = row.get("posts_errors");

    Ok(BlogImportBatch {
        batch_id: parse_uuid(&batch_id)?,
        status: parse_status(&status)?,
        posts_total: posts_total as u64,
        posts_success: posts_success as u64,
        posts_skipped: posts_skipped as u64,
        posts_errors: posts_errors as u64,
        image_map: from_json(&image_map)?,
        redirects: from_json(&redirects)?,
        error_entries: from_json(&error_entries)?,
        initiated_by: row.get("initiated_by"),
        started_at: parse_timestamp(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("Failed to parse batch id: {}", e)))
}

fn parse_status(text: &str) -> Result<BatchStatus> {
    BatchStatus::parse(text)
        .ok_or_else(|| Error::Internal(format!("Unknown batch status: {}", text)))
}

fn parse_timestamp(text: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("JSON encode failed: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::Internal(format!("JSON decode failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_memory_database;
    use paindex_common::events::BatchStatus;

    #[tokio::test]
    async fn import_batch_round_trips_through_save() {
        let pool = init_memory_database().await.unwrap();

        let mut batch = ImportBatch::new("clinics.csv".to_string(), Some("admin".to_string()));
        batch.total = 120;
        batch.record_error(Some(7), None, "missing required fields: city".to_string());
        save_import_batch(&pool, &batch).await.unwrap();

        batch.transition_to(BatchStatus::Completed);
        batch.success = 118;
        save_import_batch(&pool, &batch).await.unwrap();

        let loaded = load_import_batch(&pool, batch.batch_id)
            .await
            .unwrap()
            .expect("batch persisted");
        assert_eq!(loaded.status, BatchStatus::Completed);
        assert_eq!(loaded.total, 120);
        assert_eq!(loaded.success, 118);
        assert_eq!(loaded.error_entries.len(), 1);
        assert_eq!(loaded.error_entries[0].row, Some(7));
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn running_guard_sees_only_non_terminal_batches() {
        let pool = init_memory_database().await.unwrap();
        assert!(!has_running_import_batch(&pool).await.unwrap());

        let mut batch = ImportBatch::new("clinics.csv".to_string(), None);
        batch.transition_to(BatchStatus::Processing);
        save_import_batch(&pool, &batch).await.unwrap();
        assert!(has_running_import_batch(&pool).await.unwrap());

        batch.transition_to(BatchStatus::Failed);
        save_import_batch(&pool, &batch).await.unwrap();
        assert!(!has_running_import_batch(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn blog_batch_preserves_image_map_and_redirects() {
        let pool = init_memory_database().await.unwrap();

        let mut batch = BlogImportBatch::new(None);
        batch.posts_total = 3;
        batch.posts_success = 3;
        batch.image_map.insert(
            "https://old.example.com/a.jpg".to_string(),
            "https://cdn.example.com/a.jpg".to_string(),
        );
        batch.redirects.push(crate::models::Redirect {
            from_slug: "old-post".to_string(),
            to_path: "/blog/old-post".to_string(),
        });
        batch.transition_to(BatchStatus::Completed);
        save_blog_batch(&pool, &batch).await.unwrap();

        let loaded = load_blog_batch(&pool, batch.batch_id)
            .await
            .unwrap()
            .expect("batch persisted");
        assert_eq!(loaded.image_map.len(), 1);
        assert_eq!(loaded.redirects, batch.redirects);
        assert_eq!(loaded.posts_success, 3);
    }
}
