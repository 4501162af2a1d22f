//! Clinic service categories and the service catalog entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The six service categories a clinic capability can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Injection,
    Procedure,
    Physical,
    Diagnostic,
    Management,
    Specialized,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Injection => "injection",
            ServiceCategory::Procedure => "procedure",
            ServiceCategory::Physical => "physical",
            ServiceCategory::Diagnostic => "diagnostic",
            ServiceCategory::Management => "management",
            ServiceCategory::Specialized => "specialized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "injection" => Some(ServiceCategory::Injection),
            "procedure" => Some(ServiceCategory::Procedure),
            "physical" => Some(ServiceCategory::Physical),
            "diagnostic" => Some(ServiceCategory::Diagnostic),
            "management" => Some(ServiceCategory::Management),
            "specialized" => Some(ServiceCategory::Specialized),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, sluggified clinic capability. Created on demand during import;
/// idempotent by slug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub category: ServiceCategory,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}