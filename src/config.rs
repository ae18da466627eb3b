//! Runtime configuration for Sentropy.
//!
//! Everything comes from the environment (optionally via a `.env` file):
//! connection strings, the text-extractor endpoint, object-store location,
//! and the empirically-derived tuning constants for date resolution.

use std::path::PathBuf;

/// Bucket that holds serialized query results.
pub const DEFAULT_RESULTS_BUCKET: &str = "results.sentimentron.co.uk";

/// Queue visibility timeout in seconds. Also bounds one article's processing.
pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory (object-store root, scratch space).
    pub data_dir: PathBuf,
    /// Database URL. Supports sqlite: URLs; set via DATABASE_URL.
    pub database_url: String,
    /// Boilerplate-removal service endpoint (HTTP POST).
    pub extractor_url: String,
    /// Bucket for serialized query results.
    pub results_bucket: String,
    /// Stop-list file, one lower-case word per line.
    pub stoplist_path: Option<PathBuf>,
    /// Sentiment lexicon file (positive/negative word lists).
    pub lexicon_path: Option<PathBuf>,
    /// Request timeout for the text extractor, in seconds.
    pub request_timeout: u64,
    /// Queue visibility timeout in seconds.
    pub visibility_timeout: u64,
    /// Soft per-article processing timeout in seconds.
    pub article_timeout: u64,
    /// Retry budget for one article after a transient failure.
    pub article_retries: u32,
    /// Host substrings that bypass the pipeline entirely.
    pub host_denylist: Vec<String>,
    /// Crawl-file key substring skipped during queue replenishment.
    pub crawl_skip_substring: Option<String>,
    /// Typical byte position of a true publication date (certain dates).
    pub certain_date_position: i64,
    /// Typical byte position of a true publication date (uncertain dates).
    pub uncertain_date_position: i64,
    /// Plausible year window for uncertain dates.
    pub uncertain_year_range: (i32, i32),
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            database_url: "sqlite:sentropy.db".to_string(),
            extractor_url: "http://localhost:8080/extract".to_string(),
            results_bucket: DEFAULT_RESULTS_BUCKET.to_string(),
            stoplist_path: None,
            lexicon_path: None,
            request_timeout: 30,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            article_timeout: DEFAULT_VISIBILITY_TIMEOUT_SECS,
            article_retries: 2,
            host_denylist: vec!["nasa.gov".to_string()],
            crawl_skip_substring: None,
            certain_date_position: 346,
            uncertain_date_position: 307,
            uncertain_year_range: (2001, 2009),
        }
    }
}

impl Settings {
    /// Build settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(dir) = std::env::var("SENT_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            settings.database_url = url;
        }
        if let Ok(url) = std::env::var("BOILERPIPE_URL") {
            settings.extractor_url = url;
        }
        if let Ok(bucket) = std::env::var("SENT_RESULTS_BUCKET") {
            settings.results_bucket = bucket;
        }
        if let Ok(path) = std::env::var("SENT_STOPLIST") {
            settings.stoplist_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("SENT_LEXICON") {
            settings.lexicon_path = Some(PathBuf::from(path));
        }
        if let Some(timeout) = parse_var("SENT_REQUEST_TIMEOUT") {
            settings.request_timeout = timeout;
        }
        if let Some(timeout) = parse_var("SENT_ARTICLE_TIMEOUT") {
            settings.article_timeout = timeout;
        }
        if let Ok(list) = std::env::var("SENT_HOST_DENYLIST") {
            settings.host_denylist = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(skip) = std::env::var("SENT_CRAWL_SKIP") {
            if !skip.is_empty() {
                settings.crawl_skip_substring = Some(skip);
            }
        }
        if let Some(pos) = parse_var("SENT_CERTAIN_DATE_POSITION") {
            settings.certain_date_position = pos;
        }
        if let Some(pos) = parse_var("SENT_UNCERTAIN_DATE_POSITION") {
            settings.uncertain_date_position = pos;
        }

        settings
    }

    /// Root directory of the filesystem object store.
    pub fn object_store_dir(&self) -> PathBuf {
        self.data_dir.join("objects")
    }

    /// Ensure the data directories exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.object_store_dir())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_empirical_date_positions() {
        let settings = Settings::default();
        assert_eq!(settings.certain_date_position, 346);
        assert_eq!(settings.uncertain_date_position, 307);
        assert_eq!(settings.uncertain_year_range, (2001, 2009));
    }

    #[test]
    fn denylist_seeds_nasa() {
        let settings = Settings::default();
        assert!(settings.host_denylist.iter().any(|h| h == "nasa.gov"));
    }
}
