//! Configuration loading for Paindex services
//!
//! Configuration is an explicit value passed into constructors. Resolution
//! priority for each field: environment variable, then TOML file, then the
//! compiled default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Service configuration shared by the import pipelines and HTTP surface
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to
    pub bind_addr: String,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Base URL of the WordPress site being migrated (e.g. "https://old.example.com")
    pub wordpress_base_url: String,

    /// Base URL for staged/migrated object uploads
    pub object_store_base_url: String,

    /// Timeout for outbound HTTP requests (seconds)
    pub http_timeout_secs: u64,

    /// Event bus channel capacity
    pub event_capacity: usize,

    /// Rows written per chunk by the CSV pipeline
    pub import_chunk_size: usize,

    /// Maximum error entries returned to the caller on completion
    pub error_report_cap: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5810".to_string(),
            database_path: PathBuf::from("paindex.db"),
            wordpress_base_url: String::new(),
            object_store_base_url: String::new(),
            http_timeout_secs: 30,
            event_capacity: 1000,
            import_chunk_size: 100,
            error_report_cap: 50,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let mut config: ServiceConfig = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment on top of compiled defaults (no TOML file)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("PAINDEX_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("PAINDEX_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("PAINDEX_WORDPRESS_BASE_URL") {
            self.wordpress_base_url = url;
        }
        if let Ok(url) = std::env::var("PAINDEX_OBJECT_STORE_BASE_URL") {
            self.object_store_base_url = url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let config = ServiceConfig::default();
        assert_eq!(config.import_chunk_size, 100);
        assert_eq!(config.error_report_cap, 50);
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:8080\"").unwrap();
        writeln!(file, "import_chunk_size = 25").unwrap();

        let config = ServiceConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.import_chunk_size, 25);
        // Unspecified fields keep their defaults
        assert_eq!(config.error_report_cap, 50);
    }
}
