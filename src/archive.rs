//! Crawl archive reading.
//!
//! A crawl archive is an xz-compressed SQLite database holding one `articles`
//! table. The object is staged to a temporary file, decompressed, and read
//! row by row; the temporary files vanish when iteration finishes.

use std::io::{Cursor, Write};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decompression error: {0}")]
    Decompress(#[from] lzma::LzmaError),
    #[error("Archive database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// One row read out of a crawl archive.
#[derive(Debug, Clone)]
pub struct ArchiveRecord {
    pub headers: Option<String>,
    pub body: Option<String>,
    pub url: String,
    pub date_crawled: DateTime<Utc>,
    pub content_type: String,
}

/// Decompress an xz-compressed SQLite archive and read all article rows.
///
/// Synchronous (rusqlite + liblzma); call from a blocking context.
pub fn read_sql_archive(compressed: &[u8]) -> Result<Vec<ArchiveRecord>> {
    let mut staged = tempfile::NamedTempFile::new()?;
    tracing::info!("Decompressing to {}...", staged.path().display());

    let mut reader = lzma::LzmaReader::new_decompressor(Cursor::new(compressed))?;
    std::io::copy(&mut reader, staged.as_file_mut())?;
    staged.as_file_mut().flush()?;

    tracing::info!("Opening database...");
    let db = rusqlite::Connection::open(staged.path())?;
    let mut stmt =
        db.prepare("SELECT headers, content, site, date_crawled, content_type FROM articles")?;

    let mut records = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let headers = text_column(row.get_ref(0)?);
        let body = text_column(row.get_ref(1)?);
        let url: String = row.get(2)?;
        let date_crawled = date_column(row.get_ref(3)?);
        let content_type: String = row.get(4)?;

        records.push(ArchiveRecord {
            headers,
            body,
            url,
            date_crawled,
            content_type,
        });
    }

    // The staged file is deleted when `staged` drops.
    Ok(records)
}

/// Read a column that may be TEXT or BLOB as UTF-8 text.
fn text_column(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        _ => None,
    }
}

/// Crawl dates appear as epoch integers or as text timestamps.
fn date_column(value: ValueRef<'_>) -> DateTime<Utc> {
    match value {
        ValueRef::Integer(epoch) => {
            DateTime::from_timestamp(epoch, 0).unwrap_or(DateTime::UNIX_EPOCH)
        }
        ValueRef::Text(bytes) => parse_date_text(&String::from_utf8_lossy(bytes)),
        _ => DateTime::UNIX_EPOCH,
    }
}

fn parse_date_text(text: &str) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return parsed.and_utc();
    }
    if let Ok(epoch) = text.parse::<i64>() {
        return DateTime::from_timestamp(epoch, 0).unwrap_or(DateTime::UNIX_EPOCH);
    }
    DateTime::UNIX_EPOCH
}

/// Read a key manifest: a plain SQLite file with a single `keys` table.
/// Used when seeding crawl files from an exported key list.
pub fn read_key_manifest(path: &std::path::Path) -> Result<Vec<String>> {
    let db = rusqlite::Connection::open(path)?;
    let mut stmt = db.prepare("SELECT key FROM keys")?;
    let keys = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(keys)
}
