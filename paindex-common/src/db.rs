//! SQLite connection pool initialization

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the SQLite database at `db_path` and return a pool.
///
/// Schema bootstrap is the service's responsibility; this only guarantees
/// the file and its parent directory exist.
pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc: read, write, create
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    Ok(pool)
}

/// In-memory pool for tests.
///
/// Pinned to a single connection that never retires; every pool connection
/// would otherwise get its own empty `:memory:` database.
pub async fn init_memory_pool() -> Result<SqlitePool> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    Ok(pool)
}
