//! Keywords: interned words with a bounded, character-restricted vocabulary.

use std::collections::HashSet;

use thiserror::Error;

/// Maximum stored keyword length.
pub const MAX_KEYWORD_LENGTH: usize = 32;

/// Maximum keywords retained per document.
pub const KEYWORD_LIMIT: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword is too short")]
    TooShort,
    #[error("keyword is too long: {0}")]
    TooLong(String),
    #[error("invalid character {1:?} in {0:?} at position {2}")]
    InvalidCharacter(String, char, usize),
    #[error("consecutive dots in {0:?}")]
    ConsecutiveDots(String),
    #[error("keyword limit of {KEYWORD_LIMIT} exceeded")]
    LimitExceeded,
}

/// Validate a keyword, returning the trimmed word.
///
/// Words are 1..=32 chars of `[A-Za-z0-9 .]` with no consecutive dots.
/// Violations drop the keyword, never the enclosing document.
pub fn validate_keyword(word: &str) -> Result<String, KeywordError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(KeywordError::TooShort);
    }
    if word.len() > MAX_KEYWORD_LENGTH {
        return Err(KeywordError::TooLong(word.to_string()));
    }
    for (pos, ch) in word.chars().enumerate() {
        if !(ch.is_ascii_alphanumeric() || ch == ' ' || ch == '.') {
            return Err(KeywordError::InvalidCharacter(word.to_string(), ch, pos));
        }
    }
    if word.contains("..") {
        return Err(KeywordError::ConsecutiveDots(word.to_string()));
    }
    Ok(word.to_string())
}

/// An interned keyword row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword {
    pub id: i64,
    pub word: String,
}

/// An ordered pair of consecutive proper-noun tokens within one run.
/// `key2` is absent for single-token runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeywordAdjacency {
    pub key1: String,
    pub key2: Option<String>,
}

/// Bounded keyword set for one document.
///
/// Adds past the limit are refused without mutating the set; invalid words
/// are refused with the validation error.
#[derive(Debug, Default)]
pub struct KeywordSet {
    words: Vec<String>,
    seen: HashSet<String>,
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a word, lower-cased for comparison. Returns whether it was added.
    pub fn add(&mut self, word: &str) -> Result<bool, KeywordError> {
        let word = validate_keyword(word)?;
        let folded = word.to_lowercase();
        if self.seen.contains(&folded) {
            return Ok(false);
        }
        if self.words.len() >= KEYWORD_LIMIT {
            return Err(KeywordError::LimitExceeded);
        }
        self.seen.insert(folded);
        self.words.push(word);
        Ok(true)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.seen.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_length_and_charset() {
        assert_eq!(validate_keyword(" apple "), Ok("apple".to_string()));
        assert_eq!(validate_keyword("Mr. Smith"), Ok("Mr. Smith".to_string()));
        assert_eq!(validate_keyword(""), Err(KeywordError::TooShort));
        assert!(matches!(
            validate_keyword(&"a".repeat(33)),
            Err(KeywordError::TooLong(_))
        ));
        assert!(matches!(
            validate_keyword("caf\u{e9}"),
            Err(KeywordError::InvalidCharacter(..))
        ));
        assert!(matches!(
            validate_keyword("a..b"),
            Err(KeywordError::ConsecutiveDots(_))
        ));
    }

    #[test]
    fn set_enforces_limit_without_mutation() {
        let mut set = KeywordSet::new();
        for i in 0..KEYWORD_LIMIT {
            assert!(set.add(&format!("word{}", i)).unwrap());
        }
        assert_eq!(set.len(), KEYWORD_LIMIT);
        assert_eq!(set.add("straw"), Err(KeywordError::LimitExceeded));
        assert_eq!(set.len(), KEYWORD_LIMIT);
        assert!(!set.contains("straw"));
    }

    #[test]
    fn set_compares_lowercase() {
        let mut set = KeywordSet::new();
        assert!(set.add("Apple").unwrap());
        assert!(!set.add("apple").unwrap());
        assert!(set.contains("APPLE"));
        assert_eq!(set.len(), 1);
    }
}
