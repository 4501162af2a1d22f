//! Blog entity persistence
//!
//! All lookups key on the foreign `wp_id` so re-running a migration finds
//! what an earlier run already created.

use paindex_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{BlogCategory, BlogPost, BlogTag};

pub async fn find_category_by_wp_id(pool: &SqlitePool, wp_id: u64) -> Result<Option<BlogCategory>> {
    let row = sqlx::query("SELECT id, wp_id, name, slug, parent_id FROM blog_categories WHERE wp_id = ?")
        .bind(wp_id as i64)
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let id: String = row.get("id");
        let wp_id: i64 = row.get("wp_id");
        let parent_id: Option<String> = row.get("parent_id");
        Ok(BlogCategory {
            id: parse_uuid(&id)?,
            wp_id: wp_id as u64,
            name: row.get("name"),
            slug: row.get("slug"),
            parent_id: parent_id.as_deref().map(parse_uuid).transpose()?,
        })
    })
    .transpose()
}

pub async fn insert_category(pool: &SqlitePool, category: &BlogCategory) -> Result<()> {
    sqlx::query(
        "INSERT INTO blog_categories (id, wp_id, name, slug, parent_id) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(category.id.to_string())
    .bind(category.wp_id as i64)
    .bind(&category.name)
    .bind(&category.slug)
    .bind(category.parent_id.map(|id| id.to_string()))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_tag_by_wp_id(pool: &SqlitePool, wp_id: u64) -> Result<Option<BlogTag>> {
    let row = sqlx::query("SELECT id, wp_id, name, slug FROM blog_tags WHERE wp_id = ?")
        .bind(wp_id as i64)
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let id: String = row.get("id");
        let wp_id: i64 = row.get("wp_id");
        Ok(BlogTag {
            id: parse_uuid(&id)?,
            wp_id: wp_id as u64,
            name: row.get("name"),
            slug: row.get("slug"),
        })
    })
    .transpose()
}

pub async fn insert_tag(pool: &SqlitePool, tag: &BlogTag) -> Result<()> {
    sqlx::query("INSERT INTO blog_tags (id, wp_id, name, slug) VALUES (?, ?, ?, ?)")
        .bind(tag.id.to_string())
        .bind(tag.wp_id as i64)
        .bind(&tag.name)
        .bind(&tag.slug)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_post_by_wp_id(pool: &SqlitePool, wp_id: u64) -> Result<Option<BlogPost>> {
    let row = sqlx::query(
        r#"
        SELECT id, wp_id, title, slug, html, excerpt, cover_image_url,
               published_at, category_ids, tag_ids
        FROM blog_posts WHERE wp_id = ?
        "#,
    )
    .bind(wp_id as i64)
    .fetch_optional(pool)
    .await?;

    row.map(post_from_row).transpose()
}

pub async fn insert_post(pool: &SqlitePool, post: &BlogPost) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO blog_posts (
            id, wp_id, title, slug, html, excerpt, cover_image_url,
            published_at, category_ids, tag_ids
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(post.id.to_string())
    .bind(post.wp_id as i64)
    .bind(&post.title)
    .bind(&post.slug)
    .bind(&post.html)
    .bind(&post.excerpt)
    .bind(&post.cover_image_url)
    .bind(post.published_at.map(|t| t.to_rfc3339()))
    .bind(to_json(&post.category_ids)?)
    .bind(to_json(&post.tag_ids)?)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn count_posts(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blog_posts")
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}

fn post_from_row(row: sqlx::sqlite::SqliteRow) -> Result<BlogPost> {
    let id: String = row.get("id");
    let wp_id: i64 = row.get("wp_id");
    let published_at: Option<String> = row.get("published_at");
    let category_ids: String = row.get("category_ids");
    let tag_ids: String = row.get("tag_ids");

    Ok(BlogPost {
        id: parse_uuid(&id)?,
        wp_id: wp_id as u64,
        title: row.get("title"),
        slug: row.get("slug"),
        html: row.get("html"),
        excerpt: row.get("excerpt"),
        cover_image_url: row.get("cover_image_url"),
        published_at: published_at
            .as_deref()
            .map(|t| {
                chrono::DateTime::parse_from_rfc3339(t)
                    .map(|dt| dt.with_timezone(&chrono::Utc))
                    .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
            })
            .transpose()?,
        category_ids: from_json(&category_ids)?,
        tag_ids: from_json(&tag_ids)?,
    })
}

fn parse_uuid(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text).map_err(|e| Error::Internal(format!("Failed to parse id: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("JSON encode failed: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::Internal(format!("JSON decode failed: {}", e)))
}
