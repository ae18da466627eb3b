//! Sentence and word tokenization over Unicode boundaries.

use unicode_segmentation::UnicodeSegmentation;

/// Split text into sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split text into word tokens.
pub fn words(text: &str) -> Vec<&str> {
    text.unicode_words().collect()
}
