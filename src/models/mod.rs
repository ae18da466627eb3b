//! Entity types persisted by the pipeline and read back by the query engine.

mod article;
mod crawl;
mod dates;
mod document;
mod domain;
mod keyword;
mod links;
mod query;
mod software;

pub use article::{Article, ArticleStatus, RawArticle, RawArticleStatus};
pub use crawl::{CrawlFile, CrawlFileKind, CrawlFileStatus, CrawlSource};
pub use dates::{validate_matched_text, AmbiguousDate, CertainDate, DateInterpretation};
pub use document::{
    validate_prob, validate_score, Document, Label, Phrase, ScoreError, Sentence, SentenceLevel,
};
pub use domain::{validate_domain_key, Domain, DomainError};
pub use keyword::{
    validate_keyword, Keyword, KeywordAdjacency, KeywordError, KeywordSet, KEYWORD_LIMIT,
};
pub use links::{validate_link_path, AbsoluteLink, LinkError, RelativeLink};
pub use query::UserQuery;
pub use software::{validate_software_version, SoftwareAction, SoftwareVersion};
