//! Component name validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ComponentKind, DefinitionsError};

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid name regex"));

/// Returns true if `name` is usable as a component name.
pub fn is_valid_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}

/// Reject names outside `[A-Za-z0-9_]+`.
pub fn validate_name(kind: ComponentKind, name: &str) -> Result<(), DefinitionsError> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(DefinitionsError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("joined_data"));
        assert!(is_valid_name("Job2"));
        assert!(is_valid_name("_private"));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("sales data"));
        assert!(!is_valid_name("sales-data"));
        assert!(!is_valid_name("a/b"));
    }

    #[test]
    fn test_validate_name_error_kind() {
        let err = validate_name(ComponentKind::Sensor, "bad name").unwrap_err();
        assert_eq!(
            err,
            DefinitionsError::InvalidName {
                kind: ComponentKind::Sensor,
                name: "bad name".to_string(),
            }
        );
    }
}
