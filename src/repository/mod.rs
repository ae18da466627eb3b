//! Repository layer for database persistence.

mod article;
mod context;
mod crawl;
mod document;
mod keyword;
mod query;
mod raw;

pub use article::ArticleRepository;
pub use context::DbContext;
pub use crawl::CrawlRepository;
pub use document::{
    AmbiguousDateRow, DocumentGraph, DocumentPayload, DocumentRepository, PhraseRow, SentenceRow,
};
pub use keyword::KeywordRepository;
pub use query::UserQueryRepository;
pub use raw::RawArticleRepository;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Whether an error is worth retrying the enclosing unit of work for.
pub fn is_transient(err: &RepositoryError) -> bool {
    match err {
        RepositoryError::Database(sqlx::Error::Database(db)) => {
            let message = db.message().to_lowercase();
            message.contains("locked") || message.contains("busy")
        }
        RepositoryError::Database(sqlx::Error::PoolTimedOut) => true,
        RepositoryError::Database(sqlx::Error::Io(_)) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_defaults_to_epoch() {
        assert_eq!(parse_datetime("not a date"), DateTime::UNIX_EPOCH);
        let parsed = parse_datetime("2008-03-01T12:00:00Z");
        assert_eq!(parsed.to_rfc3339(), "2008-03-01T12:00:00+00:00");
    }

    #[test]
    fn optional_datetime_drops_garbage() {
        assert_eq!(parse_datetime_opt(None), None);
        assert_eq!(parse_datetime_opt(Some("junk".into())), None);
        assert!(parse_datetime_opt(Some("2008-03-01T12:00:00Z".into())).is_some());
    }
}
