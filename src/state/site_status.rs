/// Site status definitions
///
/// A site row is created as `Indexing` when a crawl starts and ends in
/// either `Indexed` or `Failed`.
use serde::Serialize;
use std::fmt;

/// Represents the indexing status of a configured site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    /// A crawl of this site is in progress
    Indexing,

    /// The last crawl of this site finished
    Indexed,

    /// The last crawl was stopped or hit a transport error
    Failed,
}

impl SiteStatus {
    /// Returns true if no crawl is running for the site
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Indexing)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_string_roundtrip() {
        for status in [SiteStatus::Indexing, SiteStatus::Indexed, SiteStatus::Failed] {
            assert_eq!(SiteStatus::from_db_string(status.to_db_string()), Some(status));
        }
    }

    #[test]
    fn test_unknown_db_string() {
        assert_eq!(SiteStatus::from_db_string("indexed"), None);
    }

    #[test]
    fn test_terminal() {
        assert!(!SiteStatus::Indexing.is_terminal());
        assert!(SiteStatus::Indexed.is_terminal());
        assert!(SiteStatus::Failed.is_terminal());
    }
}
