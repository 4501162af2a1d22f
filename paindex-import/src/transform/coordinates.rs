//! Coordinate parsing and validation
//!
//! A record needs valid, non-zero coordinates to be importable. Values may
//! arrive as separate latitude/longitude columns or as one combined
//! "lat,lon" column. `(0,0)` is treated as missing data from the scraper,
//! never as a real location.

/// Parse and validate coordinates from whichever columns are present.
///
/// Preference order: explicit lat/lon pair, then the combined column.
/// Returns `None` for unparsable, out-of-range, or (0,0) values.
pub fn parse_coordinates(
    lat: Option<&str>,
    lon: Option<&str>,
    combined: Option<&str>,
) -> Option<(f64, f64)> {
    if let (Some(lat), Some(lon)) = (lat, lon) {
        if let Some(pair) = validate(lat.trim().parse().ok()?, lon.trim().parse().ok()?) {
            return Some(pair);
        }
    }

    let combined = combined?;
    let (lat, lon) = combined.split_once(',')?;
    validate(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

fn validate(lat: f64, lon: f64) -> Option<(f64, f64)> {
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }
    if lat == 0.0 && lon == 0.0 {
        return None;
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some((lat, lon))
}
