//! Object store handle model.
//!
//! # Invariants
//! - A handle names exactly one object in the external store.
//! - The store is the sole authority on whether a handle exists.

use std::fmt::{Display, Formatter};

/// Opaque label of one object in the external store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(String);

impl Handle {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits a comma-separated store result into handles.
    ///
    /// Segments are trimmed and empty segments are dropped, so a blank
    /// result yields an empty list.
    pub fn parse_list(raw: &str) -> Vec<Handle> {
        raw.split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(Handle::new)
            .collect()
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::Handle;

    #[test]
    fn parse_list_keeps_creation_order() {
        let handles = Handle::parse_list("Q_{f'},q_{1}, q_{2}");
        assert_eq!(
            handles,
            vec![
                Handle::from("Q_{f'}"),
                Handle::from("q_{1}"),
                Handle::from("q_{2}")
            ]
        );
    }

    #[test]
    fn parse_list_of_blank_result_is_empty() {
        assert!(Handle::parse_list("").is_empty());
        assert!(Handle::parse_list(" , ").is_empty());
    }

    #[test]
    fn display_is_raw_label() {
        assert_eq!(Handle::from("μ_{1}").to_string(), "μ_{1}");
    }
}
