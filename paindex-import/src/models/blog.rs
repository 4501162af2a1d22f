//! Local blog entities produced by the WordPress migration
//!
//! Each entity keeps the foreign `wp_id` so a re-run finds and reuses what
//! an earlier run created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local blog category, mapped 1:1 from a WordPress category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogCategory {
    pub id: Uuid,
    pub wp_id: u64,
    pub name: String,
    pub slug: String,
    /// Local parent, resolved parent-before-child during import. May be
    /// `None` for roots and for dangling-parent input (best-effort import).
    pub parent_id: Option<Uuid>,
}

/// Local blog tag, mapped 1:1 from a WordPress tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogTag {
    pub id: Uuid,
    pub wp_id: u64,
    pub name: String,
    pub slug: String,
}

/// Migrated blog post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: Uuid,
    pub wp_id: u64,
    pub title: String,
    pub slug: String,
    /// Rewritten, sanitized HTML body
    pub html: String,
    pub excerpt: String,
    pub cover_image_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub category_ids: Vec<Uuid>,
    pub tag_ids: Vec<Uuid>,
}
