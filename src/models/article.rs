//! Raw crawled articles and their processed counterparts.

use chrono::{DateTime, Utc};

/// Processing state of a raw article pulled out of a crawl archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawArticleStatus {
    Unprocessed,
    Processed,
    Error,
}

impl RawArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unprocessed => "Unprocessed",
            Self::Processed => "Processed",
            Self::Error => "Error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unprocessed" => Some(Self::Unprocessed),
            "Processed" => Some(Self::Processed),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One record read from a crawl archive, body and all.
///
/// Bodies are kept only until the enrichment pipeline has consumed them.
#[derive(Debug, Clone)]
pub struct RawArticle {
    pub id: i64,
    pub crawl_id: i64,
    pub url: String,
    pub content_type: String,
    pub date_crawled: DateTime<Utc>,
    pub headers: Option<String>,
    pub body: Option<String>,
    pub status: RawArticleStatus,
}

/// Terminal state of one article after a pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    Processed,
    NoDates,
    NoContent,
    UnsupportedType,
    ClassificationError,
    LanguageError,
    OtherError,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "Processed",
            Self::NoDates => "NoDates",
            Self::NoContent => "NoContent",
            Self::UnsupportedType => "UnsupportedType",
            Self::ClassificationError => "ClassificationError",
            Self::LanguageError => "LanguageError",
            Self::OtherError => "OtherError",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Processed" => Some(Self::Processed),
            "NoDates" => Some(Self::NoDates),
            "NoContent" => Some(Self::NoContent),
            "UnsupportedType" => Some(Self::UnsupportedType),
            "ClassificationError" => Some(Self::ClassificationError),
            "LanguageError" => Some(Self::LanguageError),
            "OtherError" => Some(Self::OtherError),
            _ => None,
        }
    }

    /// Whether the pass produced a Document graph.
    pub fn produces_document(&self) -> bool {
        matches!(self, Self::Processed)
    }
}

/// One processed article: a (domain, path, crawl) triple with an outcome.
#[derive(Debug, Clone)]
pub struct Article {
    pub id: i64,
    pub path: String,
    pub crawled: DateTime<Utc>,
    pub inserted: DateTime<Utc>,
    pub crawl_id: Option<i64>,
    pub domain_id: i64,
    pub status: ArticleStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_processed_produces_document() {
        assert!(ArticleStatus::Processed.produces_document());
        for status in [
            ArticleStatus::NoDates,
            ArticleStatus::NoContent,
            ArticleStatus::UnsupportedType,
            ArticleStatus::ClassificationError,
            ArticleStatus::LanguageError,
            ArticleStatus::OtherError,
        ] {
            assert!(!status.produces_document());
        }
    }

    #[test]
    fn status_round_trips() {
        for status in [
            ArticleStatus::Processed,
            ArticleStatus::NoDates,
            ArticleStatus::NoContent,
            ArticleStatus::UnsupportedType,
            ArticleStatus::ClassificationError,
            ArticleStatus::LanguageError,
            ArticleStatus::OtherError,
        ] {
            assert_eq!(ArticleStatus::parse(status.as_str()), Some(status));
        }
    }
}
