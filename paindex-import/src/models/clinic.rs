//! Clinic record shapes: the canonical transform output, the persisted
//! entity, and the typed patch used for non-destructive merges

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical clinic record produced by the transformer from any input format.
///
/// Invariant (enforced at transform time): title, city, state and postal
/// code are non-empty and the coordinates are valid and non-zero. Rows that
/// cannot satisfy this are skipped, never defaulted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransformedClinicRecord {
    pub title: String,
    pub street: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub lat: f64,
    pub lon: f64,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub website: Option<String>,
    pub amenities: Vec<String>,
    /// Category-like strings carried through to service auto-linking
    pub categories: Vec<String>,
    /// Stable external identifier from the geo scraper, when present
    pub place_id: Option<String>,
    /// Legacy permalink, when present
    pub permalink: Option<String>,
}

/// Persisted clinic entity.
///
/// Uniqueness: at most one record per non-null `place_id`, at most one per
/// `permalink` (both enforced by the schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicEntity {
    pub id: Uuid,
    pub title: String,
    pub street: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub lat: f64,
    pub lon: f64,
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    pub website: Option<String>,
    pub amenities: Vec<String>,
    pub categories: Vec<String>,
    pub place_id: Option<String>,
    pub permalink: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Typed partial for `update`-policy merges.
///
/// `None` means "leave the stored value alone"; there is no way to null out
/// an existing field through a patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicPatch {
    pub title: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub phones: Option<Vec<String>>,
    pub emails: Option<Vec<String>>,
    pub website: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub categories: Option<Vec<String>>,
    pub place_id: Option<String>,
    pub permalink: Option<String>,
}

impl TransformedClinicRecord {
    /// Patch carrying only the fields this record actually has values for
    pub fn as_patch(&self) -> ClinicPatch {
        fn non_empty(s: &str) -> Option<String> {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }

        ClinicPatch {
            title: non_empty(&self.title),
            street: self.street.as_deref().and_then(non_empty),
            city: non_empty(&self.city),
            state: non_empty(&self.state),
            postal_code: non_empty(&self.postal_code),
            lat: Some(self.lat),
            lon: Some(self.lon),
            phones: (!self.phones.is_empty()).then(|| self.phones.clone()),
            emails: (!self.emails.is_empty()).then(|| self.emails.clone()),
            website: self.website.as_deref().and_then(non_empty),
            amenities: (!self.amenities.is_empty()).then(|| self.amenities.clone()),
            categories: (!self.categories.is_empty()).then(|| self.categories.clone()),
            place_id: self.place_id.as_deref().and_then(non_empty),
            permalink: self.permalink.as_deref().and_then(non_empty),
        }
    }
}

impl ClinicEntity {
    /// Apply a patch, overwriting only the fields present in it
    pub fn apply_patch(&mut self, patch: &ClinicPatch) {
        if let Some(v) = &patch.title {
            self.title = v.clone();
        }
        if let Some(v) = &patch.street {
            self.street = Some(v.clone());
        }
        if let Some(v) = &patch.city {
            self.city = v.clone();
        }
        if let Some(v) = &patch.state {
            self.state = v.clone();
        }
        if let Some(v) = &patch.postal_code {
            self.postal_code = v.clone();
        }
        if let Some(v) = patch.lat {
            self.lat = v;
        }
        if let Some(v) = patch.lon {
            self.lon = v;
        }
        if let Some(v) = &patch.phones {
            self.phones = v.clone();
        }
        if let Some(v) = &patch.emails {
            self.emails = v.clone();
        }
        if let Some(v) = &patch.website {
            self.website = Some(v.clone());
        }
        if let Some(v) = &patch.amenities {
            self.amenities = v.clone();
        }
        if let Some(v) = &patch.categories {
            self.categories = v.clone();
        }
        if let Some(v) = &patch.place_id {
            self.place_id = Some(v.clone());
        }
        if let Some(v) = &patch.permalink {
            self.permalink = Some(v.clone());
        }
        self.updated_at = Utc::now();
    }

    /// Full replacement of all imported fields (overwrite policy)
    pub fn overwrite_from(&mut self, record: &TransformedClinicRecord) {
        self.title = record.title.clone();
        self.street = record.street.clone();
        self.city = record.city.clone();
        self.state = record.state.clone();
        self.postal_code = record.postal_code.clone();
        self.lat = record.lat;
        self.lon = record.lon;
        self.phones = record.phones.clone();
        self.emails = record.emails.clone();
        self.website = record.website.clone();
        self.amenities = record.amenities.clone();
        self.categories = record.categories.clone();
        if record.place_id.is_some() {
            self.place_id = record.place_id.clone();
        }
        if record.permalink.is_some() {
            self.permalink = record.permalink.clone();
        }
        self.updated_at = Utc::now();
    }
}

impl From<&TransformedClinicRecord> for ClinicEntity {
    fn from(record: &TransformedClinicRecord) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: record.title.clone(),
            street: record.street.clone(),
            city: record.city.clone(),
            state: record.state.clone(),
            postal_code: record.postal_code.clone(),
            lat: record.lat,
            lon: record.lon,
            phones: record.phones.clone(),
            emails: record.emails.clone(),
            website: record.website.clone(),
            amenities: record.amenities.clone(),
            categories: record.categories.clone(),
            place_id: record.place_id.clone(),
            permalink: record.permalink.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}
