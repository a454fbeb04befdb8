//! Composite key parsing and dispatch.
//!
//! Incoming keys look like `vault_key::app::db-pass`: the first `::` segment
//! selects the read mode, the last segment is the bare secret key. Keys that
//! do not follow this shape are rejected, which the host framework treats as
//! a plain not-found rather than an error.

use crate::config::LookupOptions;
use regex::Regex;

/// Sentinel value of `VAULT_TOKEN` that disables this backend entirely
/// without removing it from the lookup chain.
pub const BYPASS_MARKER: &str = "IGNORE-VAULT";

/// Read mode selected by the composite key's first segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Read one secret (`vault_key::…`).
    Key,
    /// List entries under a path (`vault_list::…`).
    List,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Key => "vault_key",
            Self::List => "vault_list",
        }
    }
}

/// A composite key accepted by this backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedKey {
    pub kind: LookupKind,
    /// Last key segment, after strip patterns were applied.
    pub bare_key: String,
}

/// Split a composite key into its kind tag and bare key.
///
/// Returns `None` for keys this backend does not serve: fewer than two
/// `::`-separated segments, or a first segment carrying neither kind tag.
/// Tag matching is substring matching, preserving the source behavior where
/// a decorated tag segment still selects the backend.
pub fn split_composite_key(composite_key: &str) -> Option<(LookupKind, &str)> {
    let segments: Vec<&str> = composite_key.split("::").collect();
    if segments.len() < 2 {
        return None;
    }

    let tag = segments[0];
    let kind = if tag.contains("vault_list") {
        LookupKind::List
    } else if tag.contains("vault_key") {
        LookupKind::Key
    } else {
        return None;
    };

    // Safe: len() >= 2 guarantees a last segment.
    Some((kind, segments[segments.len() - 1]))
}

/// Remove every non-overlapping occurrence of each strip pattern from the
/// bare key, in list order.
pub fn apply_strip_patterns(bare_key: &str, patterns: &[Regex]) -> String {
    let mut key = bare_key.to_string();
    for pattern in patterns {
        key = pattern.replace_all(&key, "").into_owned();
    }
    key
}

/// Parse and normalize a composite key with the lookup's options applied.
pub fn parse_composite_key(composite_key: &str, options: &LookupOptions) -> Option<ParsedKey> {
    let (kind, raw_key) = split_composite_key(composite_key)?;
    let bare_key = apply_strip_patterns(raw_key, &options.strip_from_keys);
    Some(ParsedKey { kind, bare_key })
}

/// Whether the backend is bypassed via the `VAULT_TOKEN` sentinel.
pub fn backend_bypassed() -> bool {
    std::env::var("VAULT_TOKEN").map(|v| v == BYPASS_MARKER).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn options(value: Value) -> LookupOptions {
        let map = match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        };
        LookupOptions::from_map(&map).unwrap()
    }

    #[test]
    fn test_single_segment_rejected() {
        assert_eq!(split_composite_key("vault_key"), None);
        assert_eq!(split_composite_key("db-pass"), None);
        assert_eq!(split_composite_key(""), None);
    }

    #[test]
    fn test_foreign_tag_rejected() {
        assert_eq!(split_composite_key("lookup::db-pass"), None);
        assert_eq!(split_composite_key("eyaml_key::db-pass"), None);
    }

    #[test]
    fn test_key_and_list_tags() {
        assert_eq!(split_composite_key("vault_key::db-pass"), Some((LookupKind::Key, "db-pass")));
        assert_eq!(split_composite_key("vault_list::apps"), Some((LookupKind::List, "apps")));
    }

    #[test]
    fn test_tag_substring_match() {
        // Decorated tags still select the backend, as in the source.
        assert_eq!(
            split_composite_key("my_vault_key_v2::db-pass"),
            Some((LookupKind::Key, "db-pass"))
        );
    }

    #[test]
    fn test_last_segment_is_bare_key() {
        assert_eq!(
            split_composite_key("vault_key::profiles::app::db-pass"),
            Some((LookupKind::Key, "db-pass"))
        );
    }

    #[test]
    fn test_strip_prefix_pattern() {
        let opts = options(json!({ "strip_from_keys": ["^app-"] }));
        let parsed = parse_composite_key("vault_key::app-db-pass", &opts).unwrap();
        assert_eq!(parsed.bare_key, "db-pass");
    }

    #[test]
    fn test_strip_removes_all_occurrences() {
        let opts = options(json!({ "strip_from_keys": ["-"] }));
        let parsed = parse_composite_key("vault_key::a-b-c", &opts).unwrap();
        assert_eq!(parsed.bare_key, "abc");
    }

    #[test]
    fn test_strip_patterns_apply_in_order() {
        let opts = options(json!({ "strip_from_keys": ["^app-", "^db-"] }));
        let parsed = parse_composite_key("vault_key::app-db-pass", &opts).unwrap();
        assert_eq!(parsed.bare_key, "pass");
    }

    #[test]
    fn test_no_strip_patterns_leave_key_untouched() {
        let opts = options(json!({}));
        let parsed = parse_composite_key("vault_key::db-pass", &opts).unwrap();
        assert_eq!(parsed.bare_key, "db-pass");
    }

    #[test]
    fn test_bypass_marker_constant() {
        assert_eq!(BYPASS_MARKER, "IGNORE-VAULT");
    }
}
