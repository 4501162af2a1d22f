//! Slug derivation for services and posts

/// Lowercase, hyphen-separated slug of `text`.
///
/// Non-alphanumeric runs collapse to single hyphens; leading and trailing
/// hyphens are dropped.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true; // suppress leading hyphen

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_slugs() {
        assert_eq!(slugify("Epidural Steroid Injection"), "epidural-steroid-injection");
        assert_eq!(slugify("  Pain -- Management!  "), "pain-management");
        assert_eq!(slugify("MRI/EMG Testing"), "mri-emg-testing");
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
    }
}
