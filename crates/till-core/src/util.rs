//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Case-insensitive substring match. An absent or blank needle matches everything.
pub fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim) {
        None | Some("") => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Exact match against an optional filter. An absent or blank filter matches everything.
pub fn equals_filter(value: &str, filter: Option<&str>) -> bool {
    match filter.map(str::trim) {
        None | Some("") => true,
        Some(filter) => value == filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn contains_ignore_case_matches_substrings() {
        assert!(contains_ignore_case("Basmati Rice", Some("rice")));
        assert!(contains_ignore_case("Basmati Rice", Some("  MATI ")));
        assert!(!contains_ignore_case("Basmati Rice", Some("beans")));
        assert!(contains_ignore_case("anything", None));
        assert!(contains_ignore_case("anything", Some("   ")));
    }

    #[test]
    fn equals_filter_is_exact() {
        assert!(equals_filter("grains", Some("grains")));
        assert!(!equals_filter("grains", Some("Grains")));
        assert!(equals_filter("grains", None));
    }
}
