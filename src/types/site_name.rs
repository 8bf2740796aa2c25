// ABOUTME: Bucket-safe site name validation.
// ABOUTME: Names become both the provisioning stack name and the bucket prefix.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiteNameError {
    #[error("site name cannot be empty")]
    Empty,

    #[error("site name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("site name must start with a letter or digit")]
    BadFirstChar,

    #[error("site name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in site name: '{0}'")]
    InvalidChar(char),
}

/// Caller-supplied identifier for one site deployment.
///
/// Constrained to lowercase DNS-label characters so the same value is valid
/// as a stack name and as part of a bucket website hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteName(String);

impl SiteName {
    pub fn new(value: &str) -> Result<Self, SiteNameError> {
        if value.is_empty() {
            return Err(SiteNameError::Empty);
        }

        if value.len() > 63 {
            return Err(SiteNameError::TooLong);
        }

        let first = value.chars().next().ok_or(SiteNameError::Empty)?;
        if !first.is_ascii_lowercase() && !first.is_ascii_digit() {
            return Err(SiteNameError::BadFirstChar);
        }

        if value.ends_with('-') {
            return Err(SiteNameError::EndsWithHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(SiteNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for SiteName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_simple_names() {
        for name in ["site1", "my-site", "0day", "a"] {
            assert!(SiteName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(SiteName::new(""), Err(SiteNameError::Empty)));
    }

    #[test]
    fn rejects_uppercase() {
        assert!(matches!(
            SiteName::new("MySite"),
            Err(SiteNameError::BadFirstChar)
        ));
        assert!(matches!(
            SiteName::new("my-Site"),
            Err(SiteNameError::InvalidChar('S'))
        ));
    }

    #[test]
    fn rejects_leading_hyphen_and_trailing_hyphen() {
        assert!(matches!(
            SiteName::new("-site"),
            Err(SiteNameError::BadFirstChar)
        ));
        assert!(matches!(
            SiteName::new("site-"),
            Err(SiteNameError::EndsWithHyphen)
        ));
    }

    #[test]
    fn rejects_overlong() {
        let name = "a".repeat(64);
        assert!(matches!(SiteName::new(&name), Err(SiteNameError::TooLong)));
        assert!(SiteName::new(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn rejects_separator_characters() {
        for name in ["my.site", "my_site", "my site", "my/site"] {
            assert!(matches!(
                SiteName::new(name),
                Err(SiteNameError::InvalidChar(_))
            ));
        }
    }

    proptest! {
        #[test]
        fn valid_names_round_trip(name in "[a-z0-9][a-z0-9-]{0,61}[a-z0-9]") {
            let parsed = SiteName::new(&name).unwrap();
            prop_assert_eq!(parsed.as_str(), name);
        }

        #[test]
        fn never_panics(input in "\\PC*") {
            let _ = SiteName::new(&input);
        }
    }
}
