//! Row transformer: typed CSV rows into canonical clinic records
//!
//! Every input row lands in exactly one of two buckets: a
//! [`TransformedClinicRecord`] ready for reconciliation, or a skipped entry
//! with a reason. The partition is deterministic.

pub mod category;
pub mod coordinates;
pub mod slug;

pub use category::{icon_for, service_category_for, DEFAULT_ICON};
pub use coordinates::parse_coordinates;
pub use slug::slugify;

use async_trait::async_trait;
use std::sync::Arc;

use crate::csv_import::{CoordsRow, CsvRow, LegacyRow, ParsedRow, PlacesRow};
use crate::models::TransformedClinicRecord;

/// Geocoding fallback for rows carrying only an address string.
///
/// Provider specifics are out of scope here; the pipeline runs without an
/// implementation and skips rows that would need one.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best-effort forward geocode; `None` when the address can't be resolved
    async fn geocode(&self, address: &str) -> Option<(f64, f64)>;
}

/// A row the transformer rejected, with its position and reason
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row_number: u64,
    pub reason: String,
}

/// Transform result: records and skips partition the input rows
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub records: Vec<(u64, TransformedClinicRecord)>,
    pub skipped: Vec<SkippedRow>,
}

/// Clinic row transformer
#[derive(Clone, Default)]
pub struct ClinicTransformer {
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl ClinicTransformer {
    pub fn new() -> Self {
        Self { geocoder: None }
    }

    pub fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder: Some(geocoder),
        }
    }

    /// Transform a batch of parsed rows.
    ///
    /// Every input row appears in exactly one of the two output lists, in
    /// input order.
    pub async fn transform_rows(&self, rows: &[ParsedRow]) -> TransformOutput {
        let mut output = TransformOutput::default();
        for row in rows {
            match self.transform_row(row).await {
                Ok(record) => output.records.push((row.row_number, record)),
                Err(reason) => {
                    tracing::debug!(row = row.row_number, reason = %reason, "Row skipped");
                    output.skipped.push(SkippedRow {
                        row_number: row.row_number,
                        reason,
                    });
                }
            }
        }
        output
    }

    /// Transform one row, or explain why it was skipped
    pub async fn transform_row(&self, row: &ParsedRow) -> Result<TransformedClinicRecord, String> {
        match &row.data {
            CsvRow::Legacy(legacy) => self.transform_legacy(legacy).await,
            CsvRow::ScraperPlaces(places) => self.transform_places(places).await,
            CsvRow::ScraperCoords(coords) => self.transform_coords(coords).await,
        }
    }

    async fn transform_legacy(&self, row: &LegacyRow) -> Result<TransformedClinicRecord, String> {
        let required = require_fields(&[
            ("title", &row.title),
            ("city", &row.city),
            ("state", &row.state),
            ("postal_code", &row.zip),
        ])?;
        let [title, city, state, postal_code] = required;

        let coords = parse_coordinates(
            row.latitude.as_deref(),
            row.longitude.as_deref(),
            row.coordinates.as_deref(),
        );
        let address_line = format!(
            "{}, {}, {} {}",
            row.address.clone().unwrap_or_default(),
            city,
            state,
            postal_code
        );
        let (lat, lon) = self.resolve_coordinates(coords, &address_line).await?;

        let mut categories = Vec::new();
        if let Some(main) = &row.main_category {
            categories.push(main.clone());
        }
        categories.extend(split_list(row.categories.as_deref(), ';'));
        dedup_preserving_order(&mut categories);

        Ok(TransformedClinicRecord {
            title,
            street: row.address.clone(),
            city,
            state,
            postal_code,
            lat,
            lon,
            phones: split_list(row.phone.as_deref(), ';'),
            emails: split_list(row.email.as_deref(), ';'),
            website: row.website.clone(),
            amenities: split_list(row.amenities.as_deref(), ';'),
            categories,
            place_id: None,
            permalink: row.permalink.clone(),
        })
    }

    async fn transform_places(&self, row: &PlacesRow) -> Result<TransformedClinicRecord, String> {
        let required = require_fields(&[
            ("title", &row.name),
            ("city", &row.city),
            ("state", &row.state),
            ("postal_code", &row.postal_code),
        ])?;
        let [title, city, state, postal_code] = required;

        let coords = parse_coordinates(row.latitude.as_deref(), row.longitude.as_deref(), None);
        let address_line = row
            .full_address
            .clone()
            .unwrap_or_else(|| format!("{}, {} {}", city, state, postal_code));
        let (lat, lon) = self.resolve_coordinates(coords, &address_line).await?;

        let mut categories = Vec::new();
        if let Some(category) = &row.category {
            categories.push(category.clone());
        }
        categories.extend(split_list(row.subtypes.as_deref(), ','));
        dedup_preserving_order(&mut categories);

        Ok(TransformedClinicRecord {
            title,
            street: row.street.clone().or_else(|| row.full_address.clone()),
            city,
            state,
            postal_code,
            lat,
            lon,
            phones: row.phone.iter().cloned().collect(),
            emails: row.email.iter().cloned().collect(),
            website: row.site.clone(),
            amenities: Vec::new(),
            categories,
            place_id: row.place_id.clone(),
            permalink: None,
        })
    }

    async fn transform_coords(&self, row: &CoordsRow) -> Result<TransformedClinicRecord, String> {
        let required = require_fields(&[
            ("title", &row.name),
            ("city", &row.city),
            ("state", &row.state),
            ("postal_code", &row.postal_code),
        ])?;
        let [title, city, state, postal_code] = required;

        let coords = parse_coordinates(row.latitude.as_deref(), row.longitude.as_deref(), None);
        let address_line = row
            .full_address
            .clone()
            .unwrap_or_else(|| format!("{}, {} {}", city, state, postal_code));
        let (lat, lon) = self.resolve_coordinates(coords, &address_line).await?;

        let mut categories = Vec::new();
        if let Some(category) = &row.category {
            categories.push(category.clone());
        }

        Ok(TransformedClinicRecord {
            title,
            street: row.full_address.clone(),
            city,
            state,
            postal_code,
            lat,
            lon,
            phones: row.phone.iter().cloned().collect(),
            emails: Vec::new(),
            website: row.site.clone(),
            amenities: Vec::new(),
            categories,
            place_id: None,
            permalink: None,
        })
    }

    /// Column coordinates when valid, geocoding fallback when configured,
    /// otherwise skip.
    async fn resolve_coordinates(
        &self,
        parsed: Option<(f64, f64)>,
        address: &str,
    ) -> Result<(f64, f64), String> {
        if let Some(pair) = parsed {
            return Ok(pair);
        }
        if let Some(geocoder) = &self.geocoder {
            if let Some(pair) = geocoder.geocode(address).await {
                return Ok(pair);
            }
        }
        Err("missing or invalid coordinates".to_string())
    }
}

/// Validate that all named fields are present; returns their values in order
fn require_fields<const N: usize>(
    fields: &[(&str, &Option<String>); N],
) -> Result<[String; N], String> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if !missing.is_empty() {
        return Err(format!("missing required fields: {}", missing.join(", ")));
    }

    Ok(std::array::from_fn(|i| {
        fields[i].1.clone().unwrap_or_default()
    }))
}

fn split_list(value: Option<&str>, separator: char) -> Vec<String> {
    value
        .map(|v| {
            v.split(separator)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn dedup_preserving_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.to_lowercase()));
}
