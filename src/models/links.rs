//! Extracted link rows: the inter-document graph.

use thiserror::Error;

pub const MAX_PATH_LENGTH: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("path is too short")]
    TooShort,
    #[error("path is too long: {0}")]
    TooLong(String),
    #[error("link paths should not contain a scheme prefix: {0}")]
    HasPrefix(String),
}

/// Validate a stored link path. Paths never carry a scheme.
pub fn validate_link_path(path: &str) -> Result<String, LinkError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(LinkError::TooShort);
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(LinkError::TooLong(path.to_string()));
    }
    if path.contains("://") {
        return Err(LinkError::HasPrefix(path.to_string()));
    }
    Ok(path.to_string())
}

/// A link within the same site.
#[derive(Debug, Clone)]
pub struct RelativeLink {
    pub id: i64,
    pub document_id: i64,
    pub path: String,
}

/// A link naming a full host.
#[derive(Debug, Clone)]
pub struct AbsoluteLink {
    pub id: i64,
    pub document_id: i64,
    pub domain_id: i64,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_prefixed_paths() {
        assert!(matches!(
            validate_link_path("http://example.com/x"),
            Err(LinkError::HasPrefix(_))
        ));
        assert_eq!(validate_link_path("/news/story"), Ok("/news/story".to_string()));
    }

    #[test]
    fn rejects_degenerate_paths() {
        assert_eq!(validate_link_path("  "), Err(LinkError::TooShort));
        assert!(matches!(
            validate_link_path(&"/a".repeat(600)),
            Err(LinkError::TooLong(_))
        ));
    }
}
