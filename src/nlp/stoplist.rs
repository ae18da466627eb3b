//! Stop-list loading: one lower-case word per line.

use std::collections::HashSet;
use std::path::Path;

/// Words excluded from keyword sets. Comparison is lower-cased.
#[derive(Debug, Default)]
pub struct StopList {
    words: HashSet<String>,
}

impl StopList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_text(&contents))
    }

    pub fn from_text(text: &str) -> Self {
        let words = text
            .lines()
            .map(|line| line.trim().to_lowercase())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();
        Self { words }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_case_insensitive() {
        let stoplist = StopList::from_text("the\nand\nof\n");
        assert!(stoplist.contains("The"));
        assert!(stoplist.contains("AND"));
        assert!(!stoplist.contains("apple"));
    }

    #[test]
    fn skips_blank_lines_and_comments() {
        let stoplist = StopList::from_text("# common words\nthe\n\nand\n");
        assert_eq!(stoplist.len(), 2);
    }
}
