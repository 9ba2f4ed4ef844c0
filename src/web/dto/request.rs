//! Request DTOs for the drive API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

fn default_recursive() -> bool {
    true
}

/// Query for listing a folder.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListQuery {
    /// Folder path; empty for the root.
    #[serde(default)]
    #[validate(
        length(max = 1024, message = "Prefix is too long"),
        custom(function = "no_control_chars")
    )]
    pub prefix: String,
}

/// Query for counting files.
#[derive(Debug, Deserialize, Validate)]
pub struct CountQuery {
    /// Folder path; empty for the root.
    #[serde(default)]
    #[validate(
        length(max = 1024, message = "Prefix is too long"),
        custom(function = "no_control_chars")
    )]
    pub prefix: String,
    /// Count the whole subtree (default) or only direct files.
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

/// Query for searching inside a folder.
#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    /// Folder path; empty for the root.
    #[serde(default)]
    #[validate(
        length(max = 1024, message = "Prefix is too long"),
        custom(function = "no_control_chars")
    )]
    pub prefix: String,
    /// Case-insensitive name fragment.
    #[validate(
        length(max = 200, message = "Search term is too long"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::MAX_PREFIX_BYTES;

    #[test]
    fn test_count_query_defaults_to_recursive() {
        let query: CountQuery = serde_json::from_str(r#"{"prefix": "a"}"#).unwrap();
        assert!(query.recursive);
    }

    #[test]
    fn test_list_query_validation() {
        let ok = ListQuery {
            prefix: "Medicina/Año 1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = ListQuery {
            prefix: "bad\u{1b}name".to_string(),
        };
        assert!(bad.validate().is_err());

        let long = ListQuery {
            prefix: "a".repeat(MAX_PREFIX_BYTES + 1),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_search_query_requires_term() {
        let blank = SearchQuery {
            prefix: String::new(),
            q: "   ".to_string(),
        };
        assert!(blank.validate().is_err());

        let ok = SearchQuery {
            prefix: String::new(),
            q: "anatomy".to_string(),
        };
        assert!(ok.validate().is_ok());
    }
}
