//! Publication date picking.
//!
//! Stacked: the certain date closest to the typical byte position, then an
//! uncertain date near its own typical position with a plausible year, then
//! the crawl date. The position constants are empirical and configurable.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use super::{MetaStack, Resolver};
use crate::config::Settings;
use crate::repository::{parse_datetime, Result};

/// Where a document's picked date came from. Presenters serialize the
/// discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateMethod {
    Certain,
    Uncertain,
    Crawled,
}

impl DateMethod {
    pub fn to_int(&self) -> i64 {
        match self {
            Self::Certain => 0,
            Self::Uncertain => 1,
            Self::Crawled => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Certain => "Certain",
            Self::Uncertain => "Uncertain",
            Self::Crawled => "Crawled",
        }
    }
}

/// The certain date closest to the expected byte position.
pub struct CertainDatePicker {
    pool: SqlitePool,
    position: i64,
}

impl CertainDatePicker {
    pub fn new(pool: SqlitePool, position: i64) -> Self {
        Self { pool, position }
    }
}

#[async_trait]
impl Resolver<i64, (DateMethod, DateTime<Utc>)> for CertainDatePicker {
    async fn resolve(&self, doc_id: &i64) -> Result<Vec<(DateMethod, DateTime<Utc>)>> {
        let row = sqlx::query(
            "SELECT date FROM certain_dates
             WHERE doc_id = ?
             ORDER BY ABS(position - ?)
             LIMIT 1",
        )
        .bind(doc_id)
        .bind(self.position)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| (DateMethod::Certain, parse_datetime(&r.get::<String, _>(0))))
            .into_iter()
            .collect())
    }
}

/// The uncertain date closest to the expected byte position, gated to a
/// plausible year window.
pub struct UncertainDatePicker {
    pool: SqlitePool,
    position: i64,
    year_range: (i32, i32),
}

impl UncertainDatePicker {
    pub fn new(pool: SqlitePool, position: i64, year_range: (i32, i32)) -> Self {
        Self {
            pool,
            position,
            year_range,
        }
    }
}

#[async_trait]
impl Resolver<i64, (DateMethod, DateTime<Utc>)> for UncertainDatePicker {
    async fn resolve(&self, doc_id: &i64) -> Result<Vec<(DateMethod, DateTime<Utc>)>> {
        let rows = sqlx::query(
            "SELECT date FROM uncertain_dates
             WHERE doc_id = ?
             ORDER BY ABS(position - ?)",
        )
        .bind(doc_id)
        .bind(self.position)
        .fetch_all(&self.pool)
        .await?;

        let (min_year, max_year) = self.year_range;
        Ok(rows
            .into_iter()
            .map(|r| parse_datetime(&r.get::<String, _>(0)))
            .find(|date| (min_year..=max_year).contains(&date.year()))
            .map(|date| (DateMethod::Uncertain, date))
            .into_iter()
            .collect())
    }
}

/// Fallback: when the article was crawled.
pub struct CrawledDatePicker {
    pool: SqlitePool,
}

impl CrawledDatePicker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Resolver<i64, (DateMethod, DateTime<Utc>)> for CrawledDatePicker {
    async fn resolve(&self, doc_id: &i64) -> Result<Vec<(DateMethod, DateTime<Utc>)>> {
        let row = sqlx::query(
            "SELECT articles.crawled
             FROM articles
                 JOIN documents ON articles.id = documents.article_id
             WHERE documents.id = ?",
        )
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row
            .map(|r| (DateMethod::Crawled, parse_datetime(&r.get::<String, _>(0))))
            .into_iter()
            .collect())
    }
}

/// The full stack.
pub struct DatePicker {
    stack: MetaStack<i64, (DateMethod, DateTime<Utc>)>,
}

impl DatePicker {
    pub fn new(pool: SqlitePool, settings: &Settings) -> Self {
        let stack = MetaStack::new(vec![
            Box::new(CertainDatePicker::new(
                pool.clone(),
                settings.certain_date_position,
            )) as Box<dyn Resolver<i64, (DateMethod, DateTime<Utc>)>>,
            Box::new(UncertainDatePicker::new(
                pool.clone(),
                settings.uncertain_date_position,
                settings.uncertain_year_range,
            )),
            Box::new(CrawledDatePicker::new(pool)),
        ]);
        Self { stack }
    }

    pub async fn pick(&self, doc_id: i64) -> Result<Option<(DateMethod, DateTime<Utc>)>> {
        Ok(self.stack.resolve(&doc_id).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::DbContext;

    async fn seed_document(ctx: &DbContext) -> i64 {
        sqlx::query("INSERT INTO domains (key, date) VALUES ('cnn.com', '2008-01-01T00:00:00Z')")
            .execute(ctx.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO articles (path, crawled, inserted, crawl_id, domain_id, status)
             VALUES ('/story', '2008-06-01T00:00:00Z', '2008-06-02T00:00:00Z', NULL, 1, 'Processed')",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO documents
                 (article_id, label, length, headline, pos_phrases, neg_phrases, pos_sentences, neg_sentences)
             VALUES (1, 'Unknown', 10, 'Headline', 0, 0, 0, 0)",
        )
        .execute(ctx.pool())
        .await
        .unwrap();
        1
    }

    #[tokio::test]
    async fn certain_beats_uncertain_beats_crawled() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let doc = seed_document(&ctx).await;
        let picker = DatePicker::new(ctx.pool().clone(), &Settings::default());

        // No date rows: falls through to the crawl date.
        let (method, _) = picker.pick(doc).await.unwrap().unwrap();
        assert_eq!(method, DateMethod::Crawled);

        // An uncertain date in the plausible window takes over.
        sqlx::query(
            "INSERT INTO uncertain_dates (doc_id, date, interpreted_with, matched_text, position)
             VALUES (?, '2005-04-03T00:00:00Z', 'DayFirstYearSecond', '3/4/2005', 300)",
        )
        .bind(doc)
        .execute(ctx.pool())
        .await
        .unwrap();
        let (method, _) = picker.pick(doc).await.unwrap().unwrap();
        assert_eq!(method, DateMethod::Uncertain);

        // A certain date wins outright.
        sqlx::query("INSERT INTO certain_dates (doc_id, date, position) VALUES (?, '2008-03-01T00:00:00Z', 350)")
            .bind(doc)
            .execute(ctx.pool())
            .await
            .unwrap();
        let (method, date) = picker.pick(doc).await.unwrap().unwrap();
        assert_eq!(method, DateMethod::Certain);
        assert_eq!(date.to_rfc3339(), "2008-03-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn certain_picks_closest_to_expected_position() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let doc = seed_document(&ctx).await;

        for (date, position) in [
            ("2001-01-01T00:00:00Z", 10),
            ("2002-01-01T00:00:00Z", 340),
            ("2003-01-01T00:00:00Z", 900),
        ] {
            sqlx::query("INSERT INTO certain_dates (doc_id, date, position) VALUES (?, ?, ?)")
                .bind(doc)
                .bind(date)
                .bind(position)
                .execute(ctx.pool())
                .await
                .unwrap();
        }

        let picker = CertainDatePicker::new(ctx.pool().clone(), 346);
        let picked = picker.resolve(&doc).await.unwrap();
        assert_eq!(picked[0].1.to_rfc3339(), "2002-01-01T00:00:00+00:00");
    }

    #[tokio::test]
    async fn uncertain_requires_plausible_year() {
        let ctx = DbContext::connect("sqlite::memory:").await.unwrap();
        let doc = seed_document(&ctx).await;

        // 1970 is outside [2001, 2009]; the picker must skip it.
        sqlx::query(
            "INSERT INTO uncertain_dates (doc_id, date, interpreted_with, matched_text, position)
             VALUES (?, '1970-05-05T00:00:00Z', 'DaySecondYearSecond', '5/5/70', 307)",
        )
        .bind(doc)
        .execute(ctx.pool())
        .await
        .unwrap();

        let picker = UncertainDatePicker::new(ctx.pool().clone(), 307, (2001, 2009));
        assert!(picker.resolve(&doc).await.unwrap().is_empty());
    }
}
