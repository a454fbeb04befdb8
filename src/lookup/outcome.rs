//! Lookup result sum type.

use serde_json::Value;

/// The three answers this backend can give the host framework for one key.
///
/// The host's lookup hierarchy interprets them as: take this value, keep
/// consulting later sources, or treat the request as never handled here
/// (which also means keep looking). A "definitively absent" answer is
/// `Found(Value::Null)`: the backend is authoritative that the key has no
/// value and the host stops searching.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// A resolved value (string, number, map, or sequence; `Null` means
    /// "authoritatively no value").
    Found(Value),
    /// Nothing here; the host should continue to the next configuration
    /// source.
    NotFound,
    /// The request was not for this backend: malformed composite key, a
    /// kind tag this backend does not serve, or the backend is bypassed.
    Rejected,
}

impl LookupOutcome {
    /// The resolved value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_accessor() {
        assert_eq!(LookupOutcome::Found(json!("x")).value(), Some(&json!("x")));
        assert_eq!(LookupOutcome::NotFound.value(), None);
        assert_eq!(LookupOutcome::Rejected.value(), None);
    }

    #[test]
    fn test_found_null_is_still_found() {
        assert!(LookupOutcome::Found(Value::Null).is_found());
    }
}
