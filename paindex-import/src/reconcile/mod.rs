//! Reconciliation: match incoming records against stored clinics and apply
//! the configured duplicate policy
//!
//! Matching precedence is place_id first, then permalink. A record with
//! neither identifier always inserts a fresh row.

use paindex_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{ClinicEntity, TransformedClinicRecord};
use crate::store::{clinics, services};

/// What to do when an incoming record matches a stored clinic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateHandling {
    /// Leave the stored clinic untouched
    #[default]
    Skip,
    /// Merge: incoming values win, absent incoming fields keep stored values
    Update,
    /// Replace all imported fields with the incoming record
    Overwrite,
}

/// How one record was reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    Inserted,
    Updated,
    SkippedDuplicate,
}

/// Reconcile one transformed record against the clinic table.
///
/// Returns the outcome and the ID of the clinic the record now corresponds
/// to (the matched row for skips, the written row otherwise).
pub async fn reconcile_record(
    pool: &SqlitePool,
    record: &TransformedClinicRecord,
    policy: DuplicateHandling,
) -> Result<(RowOutcome, Uuid)> {
    let existing = find_match(pool, record).await?;

    match existing {
        None => {
            let entity = ClinicEntity::from(record);
            clinics::insert(pool, &entity).await?;
            link_services(pool, entity.id, &record.categories).await;
            Ok((RowOutcome::Inserted, entity.id))
        }
        Some(mut entity) => match policy {
            DuplicateHandling::Skip => Ok((RowOutcome::SkippedDuplicate, entity.id)),
            DuplicateHandling::Update => {
                entity.apply_patch(&record.as_patch());
                clinics::update(pool, &entity).await?;
                link_services(pool, entity.id, &record.categories).await;
                Ok((RowOutcome::Updated, entity.id))
            }
            DuplicateHandling::Overwrite => {
                entity.overwrite_from(record);
                clinics::update(pool, &entity).await?;
                link_services(pool, entity.id, &record.categories).await;
                Ok((RowOutcome::Updated, entity.id))
            }
        },
    }
}

/// Stored clinic matching this record, by place_id then permalink
async fn find_match(
    pool: &SqlitePool,
    record: &TransformedClinicRecord,
) -> Result<Option<ClinicEntity>> {
    if let Some(place_id) = record.place_id.as_deref() {
        if let Some(clinic) = clinics::find_by_place_id(pool, place_id).await? {
            return Ok(Some(clinic));
        }
    }
    if let Some(permalink) = record.permalink.as_deref() {
        if let Some(clinic) = clinics::find_by_permalink(pool, permalink).await? {
            return Ok(Some(clinic));
        }
    }
    Ok(None)
}

/// Resolve category strings to services and link them to the clinic.
///
/// Runs after the clinic write has committed. Failures are logged and do not
/// fail the row; the clinic record is already durable.
async fn link_services(pool: &SqlitePool, clinic_id: Uuid, categories: &[String]) {
    for (order, category) in categories.iter().enumerate() {
        let service = match services::get_or_create(pool, category).await {
            Ok(service) => service,
            Err(e) => {
                tracing::warn!(
                    clinic_id = %clinic_id,
                    category = %category,
                    error = %e,
                    "Service resolution failed; clinic saved without this link"
                );
                continue;
            }
        };
        if let Err(e) = services::link_clinic(pool, clinic_id, service.id, order as i64).await {
            tracing::warn!(
                clinic_id = %clinic_id,
                service = %service.slug,
                error = %e,
                "Service link failed; clinic saved without this link"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::init_memory_database;

    fn record(place_id: Option<&str>) -> TransformedClinicRecord {
        TransformedClinicRecord {
            title: "Austin Pain Clinic".to_string(),
            street: Some("100 Main St".to_string()),
            city: "Austin".to_string(),
            state: "TX".to_string(),
            postal_code: "78701".to_string(),
            lat: 30.27,
            lon: -97.74,
            phones: vec!["512-555-0100".to_string()],
            emails: vec![],
            website: Some("https://austinpain.example.com".to_string()),
            amenities: vec![],
            categories: vec![
                "Epidural Steroid Injection".to_string(),
                "Physical Therapy".to_string(),
            ],
            place_id: place_id.map(str::to_string),
            permalink: None,
        }
    }

    #[tokio::test]
    async fn new_record_inserts_and_links_services() {
        let pool = init_memory_database().await.unwrap();

        let (outcome, clinic_id) = reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Skip)
            .await
            .unwrap();
        assert_eq!(outcome, RowOutcome::Inserted);

        let linked = services::linked_service_ids(&pool, clinic_id).await.unwrap();
        assert_eq!(linked.len(), 2);
    }

    #[tokio::test]
    async fn skip_policy_leaves_match_untouched() {
        let pool = init_memory_database().await.unwrap();

        let (_, first_id) = reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Skip)
            .await
            .unwrap();

        let mut changed = record(Some("P1"));
        changed.title = "Renamed Clinic".to_string();
        let (outcome, matched_id) = reconcile_record(&pool, &changed, DuplicateHandling::Skip)
            .await
            .unwrap();

        assert_eq!(outcome, RowOutcome::SkippedDuplicate);
        assert_eq!(matched_id, first_id);

        let stored = clinics::find_by_id(&pool, first_id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Austin Pain Clinic");
        assert_eq!(clinics::count(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_policy_merges_without_nulling() {
        let pool = init_memory_database().await.unwrap();

        let (_, clinic_id) = reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Skip)
            .await
            .unwrap();

        let mut incoming = record(Some("P1"));
        incoming.title = "Austin Pain & Spine".to_string();
        incoming.website = None;
        let (outcome, _) = reconcile_record(&pool, &incoming, DuplicateHandling::Update)
            .await
            .unwrap();
        assert_eq!(outcome, RowOutcome::Updated);

        let stored = clinics::find_by_id(&pool, clinic_id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Austin Pain & Spine");
        // Absent incoming field survives the merge
        assert_eq!(stored.website.as_deref(), Some("https://austinpain.example.com"));
    }

    #[tokio::test]
    async fn overwrite_policy_replaces_imported_fields() {
        let pool = init_memory_database().await.unwrap();

        let (_, clinic_id) = reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Skip)
            .await
            .unwrap();

        let mut incoming = record(Some("P1"));
        incoming.website = None;
        incoming.phones = vec![];
        let (outcome, _) = reconcile_record(&pool, &incoming, DuplicateHandling::Overwrite)
            .await
            .unwrap();
        assert_eq!(outcome, RowOutcome::Updated);

        let stored = clinics::find_by_id(&pool, clinic_id).await.unwrap().unwrap();
        assert!(stored.website.is_none());
        assert!(stored.phones.is_empty());
    }

    #[tokio::test]
    async fn permalink_match_used_when_no_place_id() {
        let pool = init_memory_database().await.unwrap();

        let mut legacy = record(None);
        legacy.permalink = Some("/clinics/austin-pain".to_string());
        let (_, first_id) = reconcile_record(&pool, &legacy, DuplicateHandling::Skip)
            .await
            .unwrap();

        let (outcome, matched_id) = reconcile_record(&pool, &legacy, DuplicateHandling::Skip)
            .await
            .unwrap();
        assert_eq!(outcome, RowOutcome::SkippedDuplicate);
        assert_eq!(matched_id, first_id);
    }

    #[tokio::test]
    async fn records_without_identifiers_always_insert() {
        let pool = init_memory_database().await.unwrap();

        reconcile_record(&pool, &record(None), DuplicateHandling::Skip)
            .await
            .unwrap();
        reconcile_record(&pool, &record(None), DuplicateHandling::Skip)
            .await
            .unwrap();

        assert_eq!(clinics::count(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn relinking_services_is_idempotent() {
        let pool = init_memory_database().await.unwrap();

        let (_, clinic_id) = reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Update)
            .await
            .unwrap();
        reconcile_record(&pool, &record(Some("P1")), DuplicateHandling::Update)
            .await
            .unwrap();

        let linked = services::linked_service_ids(&pool, clinic_id).await.unwrap();
        assert_eq!(linked.len(), 2);
    }
}
