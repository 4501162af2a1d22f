//! Database access for the import service
//!
//! Array-ish fields (phones, categories, error entries, redirects) are
//! stored as JSON text columns; entity IDs are UUID strings.

pub mod batches;
pub mod blog;
pub mod clinics;
pub mod services;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the service database and create any missing tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = paindex_common::db::init_pool(db_path).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

/// In-memory database with full schema, for tests
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = paindex_common::db::init_memory_pool().await?;
    init_tables(&pool).await?;
    Ok(pool)
}

async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clinics (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            street TEXT,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            postal_code TEXT NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            phones TEXT NOT NULL DEFAULT '[]',
            emails TEXT NOT NULL DEFAULT '[]',
            website TEXT,
            amenities TEXT NOT NULL DEFAULT '[]',
            categories TEXT NOT NULL DEFAULT '[]',
            place_id TEXT UNIQUE,
            permalink TEXT UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            icon TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clinic_services (
            clinic_id TEXT NOT NULL,
            service_id TEXT NOT NULL,
            is_featured INTEGER NOT NULL DEFAULT 0,
            display_order INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (clinic_id, service_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_batches (
            batch_id TEXT PRIMARY KEY,
            source_file TEXT NOT NULL,
            status TEXT NOT NULL,
            total INTEGER NOT NULL DEFAULT 0,
            success INTEGER NOT NULL DEFAULT 0,
            errors INTEGER NOT NULL DEFAULT 0,
            skipped INTEGER NOT NULL DEFAULT 0,
            error_entries TEXT NOT NULL DEFAULT '[]',
            initiated_by TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_import_batches (
            batch_id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            posts_total INTEGER NOT NULL DEFAULT 0,
            posts_success INTEGER NOT NULL DEFAULT 0,
            posts_skipped INTEGER NOT NULL DEFAULT 0,
            posts_errors INTEGER NOT NULL DEFAULT 0,
            image_map TEXT NOT NULL DEFAULT '{}',
            redirects TEXT NOT NULL DEFAULT '[]',
            error_entries TEXT NOT NULL DEFAULT '[]',
            initiated_by TEXT,
            started_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_categories (
            id TEXT PRIMARY KEY,
            wp_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            parent_id TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_tags (
            id TEXT PRIMARY KEY,
            wp_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS blog_posts (
            id TEXT PRIMARY KEY,
            wp_id INTEGER NOT NULL UNIQUE,
            title TEXT NOT NULL,
            slug TEXT NOT NULL,
            html TEXT NOT NULL,
            excerpt TEXT NOT NULL,
            cover_image_url TEXT,
            published_at TEXT,
            category_ids TEXT NOT NULL DEFAULT '[]',
            tag_ids TEXT NOT NULL DEFAULT '[]'
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");
    Ok(())
}
