//! Database context for managing the connection pool and repository access.
//!
//! Provides a unified entry point for database operations, eliminating
//! the need for individual pool creation in each command.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use super::{
    ArticleRepository, CrawlRepository, DocumentRepository, KeywordRepository, Result,
    UserQueryRepository, RawArticleRepository,
};

/// Database context that manages the connection pool and provides repository access.
///
/// This is the primary interface for database operations. Create one context
/// per command or service, then use it to access all repositories.
#[derive(Clone)]
pub struct DbContext {
    pool: SqlitePool,
}

impl DbContext {
    /// Open a connection pool from a database URL and initialize the schema.
    ///
    /// Supports SQLite URLs like `sqlite:path/to/db.sqlite`. In-memory
    /// databases are capped to a single connection so every handle sees the
    /// same store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            pool_options = pool_options.max_connections(1);
        }

        let pool = pool_options.connect_with(options).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// Create a context with an existing pool (for sharing across services).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn crawl(&self) -> CrawlRepository {
        CrawlRepository::new(self.pool.clone())
    }

    pub fn raw_articles(&self) -> RawArticleRepository {
        RawArticleRepository::new(self.pool.clone())
    }

    pub fn articles(&self) -> ArticleRepository {
        ArticleRepository::new(self.pool.clone())
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    pub fn keywords(&self) -> KeywordRepository {
        KeywordRepository::new(self.pool.clone())
    }

    pub fn user_queries(&self) -> UserQueryRepository {
        UserQueryRepository::new(self.pool.clone())
    }

    /// Initialize all database schemas.
    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crawl_sources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS crawl_files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'Incomplete',
                kind TEXT NOT NULL,
                source_id INTEGER NOT NULL REFERENCES crawl_sources(id),
                date_loaded TEXT NOT NULL,
                date_update TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                crawl_id INTEGER NOT NULL REFERENCES crawl_files(id),
                url TEXT NOT NULL,
                content_type TEXT NOT NULL,
                date_crawled TEXT NOT NULL,
                headers TEXT,
                body TEXT,
                status TEXT NOT NULL DEFAULT 'Unprocessed',
                UNIQUE(crawl_id, url, date_crawled)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_article_results (
                raw_article_id INTEGER PRIMARY KEY REFERENCES raw_articles(id),
                status TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS raw_article_conversions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                raw_article_id INTEGER NOT NULL UNIQUE REFERENCES raw_articles(id),
                inserted_id INTEGER NOT NULL REFERENCES articles(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS domains (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                date TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL,
                crawled TEXT NOT NULL,
                inserted TEXT NOT NULL,
                crawl_id INTEGER REFERENCES crawl_files(id),
                domain_id INTEGER NOT NULL REFERENCES domains(id),
                status TEXT NOT NULL,
                UNIQUE(domain_id, path, crawl_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                article_id INTEGER NOT NULL REFERENCES articles(id),
                label TEXT NOT NULL,
                length INTEGER NOT NULL CHECK(length > 0),
                headline TEXT NOT NULL CHECK(length(headline) > 0),
                pos_phrases INTEGER NOT NULL CHECK(pos_phrases >= 0),
                neg_phrases INTEGER NOT NULL CHECK(neg_phrases >= 0),
                pos_sentences INTEGER NOT NULL CHECK(pos_sentences >= 0),
                neg_sentences INTEGER NOT NULL CHECK(neg_sentences >= 0)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sentences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document INTEGER NOT NULL REFERENCES documents(id),
                score REAL NOT NULL CHECK(score >= -1 AND score <= 1),
                prob REAL NOT NULL CHECK(prob >= 0 AND prob <= 1),
                label TEXT NOT NULL,
                level TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS phrases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sentence INTEGER NOT NULL REFERENCES sentences(id),
                score REAL NOT NULL CHECK(score >= -1 AND score <= 1),
                prob REAL NOT NULL CHECK(prob >= 0 AND prob <= 1),
                label TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                word TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keyword_incidences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                keyword_id INTEGER NOT NULL REFERENCES keywords(id),
                phrase_id INTEGER NOT NULL REFERENCES phrases(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS keyword_adjacencies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id INTEGER NOT NULL REFERENCES documents(id),
                key1_id INTEGER NOT NULL REFERENCES keywords(id),
                key2_id INTEGER REFERENCES keywords(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS certain_dates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id INTEGER NOT NULL REFERENCES documents(id),
                date TEXT NOT NULL,
                position INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS uncertain_dates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id INTEGER NOT NULL REFERENCES documents(id),
                date TEXT NOT NULL,
                interpreted_with TEXT NOT NULL,
                matched_text TEXT NOT NULL,
                position INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links_relative (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id),
                path TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links_absolute (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id),
                domain_id INTEGER NOT NULL REFERENCES domains(id),
                path TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS software (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                software TEXT NOT NULL UNIQUE
                    CHECK(length(software) > 0 AND length(software) <= 256)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS software_involvements (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id INTEGER NOT NULL REFERENCES documents(id),
                software_id INTEGER NOT NULL REFERENCES software(id),
                action TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL UNIQUE,
                created TEXT NOT NULL,
                fulfilled TEXT,
                email TEXT,
                message TEXT,
                cancelled INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_query_keywords (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER NOT NULL REFERENCES user_queries(id),
                keyword_id INTEGER NOT NULL REFERENCES keywords(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_query_domains (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER NOT NULL REFERENCES user_queries(id),
                domain_id INTEGER NOT NULL REFERENCES domains(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_query_articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query_id INTEGER NOT NULL REFERENCES user_queries(id),
                document_id INTEGER NOT NULL REFERENCES documents(id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS queue_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                queue TEXT NOT NULL,
                body TEXT NOT NULL,
                visible_at TEXT NOT NULL,
                receive_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Indexes
        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_crawl_files_status ON crawl_files(status)",
            "CREATE INDEX IF NOT EXISTS idx_raw_articles_status ON raw_articles(status)",
            "CREATE INDEX IF NOT EXISTS idx_articles_domain ON articles(domain_id)",
            "CREATE INDEX IF NOT EXISTS idx_documents_article ON documents(article_id)",
            "CREATE INDEX IF NOT EXISTS idx_sentences_document ON sentences(document)",
            "CREATE INDEX IF NOT EXISTS idx_phrases_sentence ON phrases(sentence)",
            "CREATE INDEX IF NOT EXISTS idx_incidences_phrase ON keyword_incidences(phrase_id)",
            "CREATE INDEX IF NOT EXISTS idx_adjacencies_doc ON keyword_adjacencies(doc_id)",
            "CREATE INDEX IF NOT EXISTS idx_adjacencies_key1 ON keyword_adjacencies(key1_id)",
            "CREATE INDEX IF NOT EXISTS idx_adjacencies_key2 ON keyword_adjacencies(key2_id)",
            "CREATE INDEX IF NOT EXISTS idx_certain_dates_doc ON certain_dates(doc_id)",
            "CREATE INDEX IF NOT EXISTS idx_uncertain_dates_doc ON uncertain_dates(doc_id)",
            "CREATE INDEX IF NOT EXISTS idx_links_absolute_doc ON links_absolute(document_id)",
            "CREATE INDEX IF NOT EXISTS idx_links_relative_doc ON links_relative(document_id)",
            "CREATE INDEX IF NOT EXISTS idx_queue_visibility ON queue_messages(queue, visible_at)",
        ] {
            sqlx::query(statement).execute(pool).await?;
        }

        Ok(())
    }

    /// Get list of all tables in the database.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
