//! CSV ingestion: format detection and parsing into typed rows

pub mod format;
pub mod parser;

pub use format::{detect_format, CandidateMismatch, CsvFormat, FormatError};
pub use parser::{
    parse_csv, CoordsRow, CsvError, CsvRow, LegacyRow, ParsedCsv, ParsedRow, PlacesRow,
    PREVIEW_ROWS,
};
