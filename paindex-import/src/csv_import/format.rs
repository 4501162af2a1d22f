//! CSV format detection
//!
//! Three upload formats are supported, distinguished by their header sets:
//!
//! - `Legacy` — the old content-management export (capitalized headers,
//!   permalink column)
//! - `ScraperPlaces` — geo-scraper export carrying a stable `place_id`
//!   (may also carry coordinate columns)
//! - `ScraperCoords` — geo-scraper export with latitude/longitude only
//!
//! Detection order matters: `ScraperPlaces` is tested before
//! `ScraperCoords` because the coordinate format's required headers are a
//! subset of what a place-id export can contain. First full match wins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detected CSV dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvFormat {
    Legacy,
    ScraperPlaces,
    ScraperCoords,
}

impl CsvFormat {
    /// Human-readable label shown in the preview UI
    pub fn label(&self) -> &'static str {
        match self {
            CsvFormat::Legacy => "Legacy directory export",
            CsvFormat::ScraperPlaces => "Scraper export (place IDs)",
            CsvFormat::ScraperCoords => "Scraper export (coordinates)",
        }
    }

    /// Headers that must all be present for this format to match
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            CsvFormat::Legacy => &["Title", "Address", "City", "State", "Zip"],
            CsvFormat::ScraperPlaces => &[
                "name",
                "full_address",
                "city",
                "state",
                "postal_code",
                "place_id",
            ],
            CsvFormat::ScraperCoords => &[
                "name",
                "full_address",
                "city",
                "state",
                "postal_code",
                "latitude",
                "longitude",
            ],
        }
    }

    /// Detection candidates in precedence order. `ScraperPlaces` must come
    /// before `ScraperCoords`; see module docs.
    pub const DETECTION_ORDER: [CsvFormat; 3] = [
        CsvFormat::Legacy,
        CsvFormat::ScraperPlaces,
        CsvFormat::ScraperCoords,
    ];
}

/// Missing headers for one rejected candidate format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateMismatch {
    pub format: CsvFormat,
    pub missing_headers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FormatError {
    /// No candidate's required headers were all present
    #[error("Unrecognized CSV header set; no supported format matched")]
    Unrecognized { candidates: Vec<CandidateMismatch> },
}

/// Detect the upload format from the header row.
///
/// Headers are matched exactly after trimming whitespace.
pub fn detect_format(headers: &[String]) -> Result<CsvFormat, FormatError> {
    let trimmed: Vec<&str> = headers.iter().map(|h| h.trim()).collect();

    let mut candidates = Vec::new();
    for format in CsvFormat::DETECTION_ORDER {
        let missing: Vec<String> = format
            .required_headers()
            .iter()
            .filter(|required| !trimmed.contains(required))
            .map(|h| h.to_string())
            .collect();

        if missing.is_empty() {
            tracing::debug!(format = ?format, "CSV format detected");
            return Ok(format);
        }
        candidates.push(CandidateMismatch {
            format,
            missing_headers: missing,
        });
    }

    Err(FormatError::Unrecognized { candidates })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn detects_legacy() {
        let h = headers(&["Title", "Address", "City", "State", "Zip", "Permalink"]);
        assert_eq!(detect_format(&h).unwrap(), CsvFormat::Legacy);
    }

    #[test]
    fn place_id_format_wins_over_coordinates() {
        // A place-id export that also carries coordinate columns must be
        // detected as ScraperPlaces, not ScraperCoords.
        let h = headers(&[
            "name",
            "full_address",
            "city",
            "state",
            "postal_code",
            "place_id",
            "latitude",
            "longitude",
        ]);
        assert_eq!(detect_format(&h).unwrap(), CsvFormat::ScraperPlaces);
    }

    #[test]
    fn coordinates_format_without_place_id() {
        let h = headers(&[
            "name",
            "full_address",
            "city",
            "state",
            "postal_code",
            "latitude",
            "longitude",
        ]);
        assert_eq!(detect_format(&h).unwrap(), CsvFormat::ScraperCoords);
    }

    #[test]
    fn unrecognized_lists_missing_headers_per_candidate() {
        let h = headers(&["name", "city", "state"]);
        let err = detect_format(&h).unwrap_err();
        let FormatError::Unrecognized { candidates } = err;
        assert_eq!(candidates.len(), 3);

        let places = candidates
            .iter()
            .find(|c| c.format == CsvFormat::ScraperPlaces)
            .unwrap();
        assert!(places.missing_headers.contains(&"place_id".to_string()));
        assert!(places.missing_headers.contains(&"full_address".to_string()));
    }

    #[test]
    fn headers_are_trimmed_before_matching() {
        let h = headers(&[" Title ", "Address", "City", "State", "Zip"]);
        assert_eq!(detect_format(&h).unwrap(), CsvFormat::Legacy);
    }
}
