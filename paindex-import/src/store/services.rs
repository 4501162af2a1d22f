//! Service catalog persistence and clinic/service linking

use chrono::Utc;
use paindex_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{Service, ServiceCategory};
use crate::transform::{icon_for, service_category_for, slugify};

/// Find a service by slug, creating it from the raw category text if absent.
///
/// Idempotent by slug: repeated imports of "Epidural Steroid Injection"
/// resolve to one service row.
pub async fn get_or_create(pool: &SqlitePool, raw_name: &str) -> Result<Service> {
    let name = raw_name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Category text produces empty slug: {:?}",
            raw_name
        )));
    }

    if let Some(existing) = find_by_slug(pool, &slug).await? {
        return Ok(existing);
    }

    let service = Service {
        id: Uuid::new_v4(),
        name: name.to_string(),
        slug: slug.clone(),
        category: service_category_for(name),
        icon: icon_for(name).to_string(),
        created_at: Utc::now(),
    };

    // A concurrent writer may have created the slug between the lookup and
    // this insert; treat that as "already exists" and re-read.
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO services (id, name, slug, category, icon, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(service.id.to_string())
    .bind(&service.name)
    .bind(&service.slug)
    .bind(service.category.as_str())
    .bind(&service.icon)
    .bind(service.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    if inserted.rows_affected() == 0 {
        return find_by_slug(pool, &slug)
            .await?
            .ok_or_else(|| Error::Internal(format!("Service vanished after insert: {}", slug)));
    }

    tracing::debug!(slug = %service.slug, category = %service.category, "Service created");
    Ok(service)
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Service>> {
    let row = sqlx::query(
        "SELECT id, name, slug, category, icon, created_at FROM services WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        let id: String = row.get("id");
        let category: String = row.get("category");
        let created_at: String = row.get("created_at");
        Ok(Service {
            id: Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("Failed to parse service id: {}", e)))?,
            name: row.get("name"),
            slug: row.get("slug"),
            category: ServiceCategory::parse(&category)
                .ok_or_else(|| Error::Internal(format!("Unknown service category: {}", category)))?,
            icon: row.get("icon"),
            created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))?
                .with_timezone(&chrono::Utc),
        })
    })
    .transpose()
}

/// Link a clinic to a service. Idempotent: an existing link is left as-is.
pub async fn link_clinic(
    pool: &SqlitePool,
    clinic_id: Uuid,
    service_id: Uuid,
    display_order: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO clinic_services (clinic_id, service_id, is_featured, display_order)
        VALUES (?, ?, 0, ?)
        "#,
    )
    .bind(clinic_id.to_string())
    .bind(service_id.to_string())
    .bind(display_order)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Service IDs linked to a clinic, in display order
pub async fn linked_service_ids(pool: &SqlitePool, clinic_id: Uuid) -> Result<Vec<Uuid>> {
    let rows = sqlx::query(
        "SELECT service_id FROM clinic_services WHERE clinic_id = ? ORDER BY display_order",
    )
    .bind(clinic_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id: String = row.get("service_id");
            Uuid::parse_str(&id)
                .map_err(|e| Error::Internal(format!("Failed to parse service id: {}", e)))
        })
        .collect()
}
