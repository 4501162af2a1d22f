//! CSV parsing into typed rows
//!
//! Parsing is pure: raw text in, typed rows plus a bounded preview out.
//! Each detected format gets its own row variant with explicit fields;
//! downstream code never touches raw header-keyed maps.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::format::{detect_format, CsvFormat, FormatError};

/// Number of rows included in the upload preview
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum CsvError {
    /// File contained nothing at all (distinct from a header-only file)
    #[error("CSV file is empty")]
    EmptyFile,

    /// Headers parsed but no data rows followed
    #[error("CSV contains no data rows")]
    NoDataRows,

    /// Unbalanced quoting, ragged rows, invalid UTF-8
    #[error("Malformed CSV: {0}")]
    Malformed(String),

    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Legacy content-management export row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyRow {
    pub title: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    /// Combined "lat,lon" column some legacy exports carry instead
    pub coordinates: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    /// Semicolon-separated amenity list
    pub amenities: Option<String>,
    /// Semicolon-separated category list
    pub categories: Option<String>,
    pub main_category: Option<String>,
    pub permalink: Option<String>,
}

/// Geo-scraper export row keyed by a stable place ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacesRow {
    pub name: Option<String>,
    pub full_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub place_id: Option<String>,
    pub phone: Option<String>,
    pub site: Option<String>,
    pub email: Option<String>,
    pub category: Option<String>,
    /// Comma-separated secondary categories
    pub subtypes: Option<String>,
}

/// Geo-scraper export row with explicit coordinates and no place ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordsRow {
    pub name: Option<String>,
    pub full_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub phone: Option<String>,
    pub site: Option<String>,
    pub category: Option<String>,
}

/// One parsed row, tagged by the detected format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CsvRow {
    Legacy(LegacyRow),
    ScraperPlaces(PlacesRow),
    ScraperCoords(CoordsRow),
}

/// A data row with its 1-based position in the file (header excluded)
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub row_number: u64,
    pub data: CsvRow,
}

/// Parse result: format, headers, typed rows, bounded raw preview
#[derive(Debug, Clone)]
pub struct ParsedCsv {
    pub format: CsvFormat,
    pub headers: Vec<String>,
    pub rows: Vec<ParsedRow>,
    /// First [`PREVIEW_ROWS`] rows as raw header-keyed values, for human
    /// review before committing to an import
    pub preview: Vec<BTreeMap<String, String>>,
}

impl ParsedCsv {
    pub fn total_rows(&self) -> u64 {
        self.rows.len() as u64
    }
}

/// Column lookup helper over one `csv::StringRecord`
struct Columns<'a> {
    index: &'a HashMap<String, usize>,
    record: &'a csv::StringRecord,
}

impl<'a> Columns<'a> {
    /// Trimmed, non-empty value of a column, or `None`
    fn get(&self, header: &str) -> Option<String> {
        let idx = *self.index.get(header)?;
        let value = self.record.get(idx)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

/// Parse raw CSV text of unknown dialect.
///
/// No side effects; does not touch the persistent store.
pub fn parse_csv(text: &str) -> Result<ParsedCsv, CsvError> {
    if text.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::Malformed(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let format = detect_format(&headers)?;

    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect();

    let mut rows = Vec::new();
    let mut preview = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| CsvError::Malformed(e.to_string()))?;
        let row_number = (i + 1) as u64;

        if preview.len() < PREVIEW_ROWS {
            let mut raw = BTreeMap::new();
            for (header, idx) in &index {
                if let Some(value) = record.get(*idx) {
                    raw.insert(header.clone(), value.to_string());
                }
            }
            preview.push(raw);
        }

        let cols = Columns {
            index: &index,
            record: &record,
        };
        let data = match format {
            CsvFormat::Legacy => CsvRow::Legacy(LegacyRow {
                title: cols.get("Title"),
                address: cols.get("Address"),
                city: cols.get("City"),
                state: cols.get("State"),
                zip: cols.get("Zip"),
                latitude: cols.get("Latitude"),
                longitude: cols.get("Longitude"),
                coordinates: cols.get("Coordinates"),
                phone: cols.get("Phone"),
                email: cols.get("Email"),
                website: cols.get("Website"),
                amenities: cols.get("Amenities"),
                categories: cols.get("Categories"),
                main_category: cols.get("Main Category"),
                permalink: cols.get("Permalink"),
            }),
            CsvFormat::ScraperPlaces => CsvRow::ScraperPlaces(PlacesRow {
                name: cols.get("name"),
                full_address: cols.get("full_address"),
                street: cols.get("street"),
                city: cols.get("city"),
                state: cols.get("state"),
                postal_code: cols.get("postal_code"),
                latitude: cols.get("latitude"),
                longitude: cols.get("longitude"),
                place_id: cols.get("place_id"),
                phone: cols.get("phone"),
                site: cols.get("site"),
                email: cols.get("email_1"),
                category: cols.get("category"),
                subtypes: cols.get("subtypes"),
            }),
            CsvFormat::ScraperCoords => CsvRow::ScraperCoords(CoordsRow {
                name: cols.get("name"),
                full_address: cols.get("full_address"),
                city: cols.get("city"),
                state: cols.get("state"),
                postal_code: cols.get("postal_code"),
                latitude: cols.get("latitude"),
                longitude: cols.get("longitude"),
                phone: cols.get("phone"),
                site: cols.get("site"),
                category: cols.get("category"),
            }),
        };

        rows.push(ParsedRow { row_number, data });
    }

    if rows.is_empty() {
        return Err(CsvError::NoDataRows);
    }

    Ok(ParsedCsv {
        format,
        headers,
        rows,
        preview,
    })
}
