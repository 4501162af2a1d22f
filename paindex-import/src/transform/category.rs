//! Service category and icon mapping
//!
//! Free-text category strings from any import source are mapped to one of
//! the six service categories by case-insensitive keyword matching. Both
//! mappings are total: unmatched text falls back to `Management` and the
//! `heart-pulse` icon, so there is no error path here.

use crate::models::ServiceCategory;

/// Default icon for unmatched category text
pub const DEFAULT_ICON: &str = "heart-pulse";

/// Keyword table in match order; first hit wins
const CATEGORY_KEYWORDS: &[(&[&str], ServiceCategory)] = &[
    (
        &["injection", "block", "epidural", "steroid"],
        ServiceCategory::Injection,
    ),
    (
        &["surgeon", "surgery", "procedure", "interventional", "ablation", "stimulator"],
        ServiceCategory::Procedure,
    ),
    (
        &["physical", "therapy", "chiroprac", "rehab", "massage", "acupunct"],
        ServiceCategory::Physical,
    ),
    (
        &["diagnos", "imaging", "radiolog", "mri", "emg"],
        ServiceCategory::Diagnostic,
    ),
    (
        &["specialist", "specialized", "sports", "spine", "orthoped", "neurolog"],
        ServiceCategory::Specialized,
    ),
];

/// Icon table, keyed by the same keyword families
const ICON_KEYWORDS: &[(&[&str], &str)] = &[
    (&["injection", "block", "epidural", "steroid"], "syringe"),
    (
        &["surgeon", "surgery", "procedure", "interventional", "ablation", "stimulator"],
        "stethoscope",
    ),
    (
        &["physical", "therapy", "chiroprac", "rehab", "massage", "acupunct"],
        "activity",
    ),
    (&["diagnos", "imaging", "radiolog", "mri", "emg"], "scan"),
    (
        &["specialist", "specialized", "sports", "spine", "orthoped", "neurolog"],
        "brain",
    ),
];

/// Map free-text category description to a service category. Total.
pub fn service_category_for(text: &str) -> ServiceCategory {
    let lower = text.to_lowercase();
    for (keywords, category) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *category;
        }
    }
    ServiceCategory::Management
}

/// Map free-text category description to a display icon. Total.
pub fn icon_for(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    for (keywords, icon) in ICON_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return icon;
        }
    }
    DEFAULT_ICON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injection_keywords() {
        assert_eq!(
            service_category_for("Nerve Block Specialists"),
            ServiceCategory::Injection
        );
        assert_eq!(
            service_category_for("Epidural steroid injections"),
            ServiceCategory::Injection
        );
    }

    #[test]
    fn procedure_keywords() {
        assert_eq!(
            service_category_for("Interventional Pain Clinic"),
            ServiceCategory::Procedure
        );
        assert_eq!(service_category_for("Spine Surgeon"), ServiceCategory::Procedure);
    }

    #[test]
    fn unmatched_text_defaults_to_management_and_heart_pulse() {
        assert_eq!(service_category_for("Wellness Spa"), ServiceCategory::Management);
        assert_eq!(icon_for("Wellness Spa"), "heart-pulse");
    }

    #[test]
    fn pain_management_maps_to_management() {
        assert_eq!(
            service_category_for("Pain Management Clinic"),
            ServiceCategory::Management
        );
    }

    #[test]
    fn mapping_is_total_on_arbitrary_input() {
        for text in ["", "   ", "ünïcode", "12345", "\n"] {
            let _ = service_category_for(text);
            let _ = icon_for(text);
        }
    }
}
