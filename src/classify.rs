//! Sentiment classification seam.
//!
//! The classifier is an external collaborator. It labels a document and
//! produces a full trace: per-sentence and per-phrase labels, scores in
//! [-1, 1] and probabilities in [0, 1]. The bundled implementation is a
//! deterministic lexicon scorer; the real model slots in behind the trait.

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

use crate::nlp;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Text is empty")]
    EmptyText,
    #[error("Classifier failure: {0}")]
    Failed(String),
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

/// One phrase in the trace.
#[derive(Debug, Clone)]
pub struct PhraseTrace {
    pub text: String,
    pub label: i8,
    pub score: f64,
    pub prob: f64,
}

/// One sentence in the trace, with its phrases.
#[derive(Debug, Clone)]
pub struct SentenceTrace {
    pub text: String,
    pub label: i8,
    pub score: f64,
    pub prob: f64,
    pub phrases: Vec<PhraseTrace>,
}

/// Document-level result plus the full trace.
#[derive(Debug, Clone)]
pub struct DocumentSentiment {
    pub label: i8,
    pub length: i64,
    pub pos_sentences: i64,
    pub neg_sentences: i64,
    pub pos_phrases: i64,
    pub neg_phrases: i64,
    pub sentences: Vec<SentenceTrace>,
}

pub trait SentimentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<DocumentSentiment>;

    /// Version string recorded in provenance.
    fn version(&self) -> &str;
}

/// Word-list classifier. Scores are the normalized difference of positive
/// and negative hits; probabilities reflect how one-sided the hits are.
pub struct LexiconClassifier {
    positive: HashSet<String>,
    negative: HashSet<String>,
    version: String,
}

const DEFAULT_POSITIVE: &[&str] = &[
    "good", "great", "excellent", "positive", "success", "successful", "win", "winning",
    "happy", "love", "loved", "best", "better", "improved", "improvement", "gain", "gains",
    "strong", "growth", "profit", "celebrated", "praise", "praised",
];

const DEFAULT_NEGATIVE: &[&str] = &[
    "bad", "poor", "terrible", "negative", "failure", "failed", "lose", "losing", "loss",
    "losses", "sad", "hate", "hated", "worst", "worse", "decline", "declined", "weak",
    "crisis", "problem", "problems", "criticised", "criticized", "blame", "blamed",
];

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            positive: DEFAULT_POSITIVE.iter().map(|w| w.to_string()).collect(),
            negative: DEFAULT_NEGATIVE.iter().map(|w| w.to_string()).collect(),
            version: format!("sentropy-lexicon/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Load word lists from a file of `+word` / `-word` lines.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut positive = HashSet::new();
        let mut negative = HashSet::new();
        for line in contents.lines() {
            let line = line.trim();
            if let Some(word) = line.strip_prefix('+') {
                positive.insert(word.to_lowercase());
            } else if let Some(word) = line.strip_prefix('-') {
                negative.insert(word.to_lowercase());
            }
        }
        Ok(Self {
            positive,
            negative,
            version: format!("sentropy-lexicon/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    fn score_tokens(&self, text: &str) -> (usize, usize, usize) {
        let mut pos = 0;
        let mut neg = 0;
        let mut total = 0;
        for word in nlp::words(text) {
            total += 1;
            let folded = word.to_lowercase();
            if self.positive.contains(&folded) {
                pos += 1;
            } else if self.negative.contains(&folded) {
                neg += 1;
            }
        }
        (pos, neg, total)
    }

    fn trace(&self, text: &str) -> (i8, f64, f64) {
        let (pos, neg, total) = self.score_tokens(text);
        if total == 0 {
            return (0, 0.0, 0.0);
        }
        let score = (pos as f64 - neg as f64) / total as f64;
        let hits = pos + neg;
        let prob = if hits == 0 {
            0.0
        } else {
            (pos.max(neg) as f64) / hits as f64
        };
        let label = match pos.cmp(&neg) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        };
        (label, score.clamp(-1.0, 1.0), prob.clamp(0.0, 1.0))
    }
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentClassifier for LexiconClassifier {
    fn classify(&self, text: &str) -> Result<DocumentSentiment> {
        if text.trim().is_empty() {
            return Err(ClassifyError::EmptyText);
        }

        let mut sentences = Vec::new();
        let mut pos_sentences = 0;
        let mut neg_sentences = 0;
        let mut pos_phrases = 0;
        let mut neg_phrases = 0;

        for sentence_text in nlp::sentences(text) {
            let (label, score, prob) = self.trace(sentence_text);
            match label {
                1 => pos_sentences += 1,
                -1 => neg_sentences += 1,
                _ => {}
            }

            let mut phrases = Vec::new();
            for phrase_text in split_phrases(sentence_text) {
                let (phrase_label, phrase_score, phrase_prob) = self.trace(phrase_text);
                match phrase_label {
                    1 => pos_phrases += 1,
                    -1 => neg_phrases += 1,
                    _ => {}
                }
                phrases.push(PhraseTrace {
                    text: phrase_text.to_string(),
                    label: phrase_label,
                    score: phrase_score,
                    prob: phrase_prob,
                });
            }

            sentences.push(SentenceTrace {
                text: sentence_text.to_string(),
                label,
                score,
                prob,
                phrases,
            });
        }

        let label = match pos_sentences.cmp(&neg_sentences) {
            std::cmp::Ordering::Greater => 1,
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
        };

        Ok(DocumentSentiment {
            label,
            length: text.len() as i64,
            pos_sentences,
            neg_sentences,
            pos_phrases,
            neg_phrases,
            sentences,
        })
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Phrases are comma/semicolon/colon-delimited chunks of a sentence.
fn split_phrases(sentence: &str) -> impl Iterator<Item = &str> {
    sentence
        .split([',', ';', ':'])
        .map(str::trim)
        .filter(|p| !p.is_empty())
}
