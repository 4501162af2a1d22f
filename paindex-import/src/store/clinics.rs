//! Clinic persistence

use paindex_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::ClinicEntity;

/// Look up a clinic by its external place ID
pub async fn find_by_place_id(pool: &SqlitePool, place_id: &str) -> Result<Option<ClinicEntity>> {
    let row = sqlx::query(&select_sql("place_id = ?"))
        .bind(place_id)
        .fetch_optional(pool)
        .await?;
    row.map(clinic_from_row).transpose()
}

/// Look up a clinic by permalink
pub async fn find_by_permalink(pool: &SqlitePool, permalink: &str) -> Result<Option<ClinicEntity>> {
    let row = sqlx::query(&select_sql("permalink = ?"))
        .bind(permalink)
        .fetch_optional(pool)
        .await?;
    row.map(clinic_from_row).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<ClinicEntity>> {
    let row = sqlx::query(&select_sql("id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;
    row.map(clinic_from_row).transpose()
}

pub async fn count(pool: &SqlitePool) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clinics")
        .fetch_one(pool)
        .await?;
    Ok(count as u64)
}

/// Insert a new clinic row
pub async fn insert(pool: &SqlitePool, clinic: &ClinicEntity) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clinics (
            id, title, street, city, state, postal_code, lat, lon,
            phones, emails, website, amenities, categories,
            place_id, permalink, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(clinic.id.to_string())
    .bind(&clinic.title)
    .bind(&clinic.street)
    .bind(&clinic.city)
    .bind(&clinic.state)
    .bind(&clinic.postal_code)
    .bind(clinic.lat)
    .bind(clinic.lon)
    .bind(to_json(&clinic.phones)?)
    .bind(to_json(&clinic.emails)?)
    .bind(&clinic.website)
    .bind(to_json(&clinic.amenities)?)
    .bind(to_json(&clinic.categories)?)
    .bind(&clinic.place_id)
    .bind(&clinic.permalink)
    .bind(clinic.created_at.to_rfc3339())
    .bind(clinic.updated_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Write all mutable fields of an existing clinic row
pub async fn update(pool: &SqlitePool, clinic: &ClinicEntity) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE clinics SET
            title = ?, street = ?, city = ?, state = ?, postal_code = ?,
            lat = ?, lon = ?, phones = ?, emails = ?, website = ?,
            amenities = ?, categories = ?, place_id = ?, permalink = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&clinic.title)
    .bind(&clinic.street)
    .bind(&clinic.city)
    .bind(&clinic.state)
    .bind(&clinic.postal_code)
    .bind(clinic.lat)
    .bind(clinic.lon)
    .bind(to_json(&clinic.phones)?)
    .bind(to_json(&clinic.emails)?)
    .bind(&clinic.website)
    .bind(to_json(&clinic.amenities)?)
    .bind(to_json(&clinic.categories)?)
    .bind(&clinic.place_id)
    .bind(&clinic.permalink)
    .bind(clinic.updated_at.to_rfc3339())
    .bind(clinic.id.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

fn select_sql(predicate: &str) -> String {
    format!(
        r#"
        SELECT id, title, street, city, state, postal_code, lat, lon,
               phones, emails, website, amenities, categories,
               place_id, permalink, created_at, updated_at
        FROM clinics WHERE {}
        "#,
        predicate
    )
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Internal(format!("JSON encode failed: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| Error::Internal(format!("JSON decode failed: {}", e)))
}

fn parse_timestamp(text: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp: {}", e)))
}

fn clinic_from_row(row: sqlx::sqlite::SqliteRow) -> Result<ClinicEntity> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Failed to parse clinic id: {}", e)))?;

    let phones: String = row.get("phones");
    let emails: String = row.get("emails");
    let amenities: String = row.get("amenities");
    let categories: String = row.get("categories");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(ClinicEntity {
        id,
        title: row.get("title"),
        street: row.get("street"),
        city: row.get("city"),
        state: row.get("state"),
        postal_code: row.get("postal_code"),
        lat: row.get("lat"),
        lon: row.get("lon"),
        phones: from_json(&phones)?,
        emails: from_json(&emails)?,
        website: row.get("website"),
        amenities: from_json(&amenities)?,
        categories: from_json(&categories)?,
        place_id: row.get("place_id"),
        permalink: row.get("permalink"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
