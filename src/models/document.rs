//! Documents and their sentiment-bearing children.

use thiserror::Error;

/// Sentiment polarity. Persists as text, travels as {-1, 0, +1}.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Label {
    Positive,
    #[default]
    Unknown,
    Negative,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Unknown => "Unknown",
            Self::Negative => "Negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Positive" => Some(Self::Positive),
            "Unknown" => Some(Self::Unknown),
            "Negative" => Some(Self::Negative),
            _ => None,
        }
    }

    /// Classifier-facing integer form.
    pub fn from_int(value: i8) -> Option<Self> {
        match value {
            1 => Some(Self::Positive),
            0 => Some(Self::Unknown),
            -1 => Some(Self::Negative),
            _ => None,
        }
    }

    pub fn to_int(&self) -> i8 {
        match self {
            Self::Positive => 1,
            Self::Unknown => 0,
            Self::Negative => -1,
        }
    }
}

/// Markup level a sentence was found at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    P,
    Other,
    Unknown,
}

impl SentenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H5 => "H5",
            Self::H6 => "H6",
            Self::P => "P",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "H1" => Some(Self::H1),
            "H2" => Some(Self::H2),
            "H3" => Some(Self::H3),
            "H4" => Some(Self::H4),
            "H5" => Some(Self::H5),
            "H6" => Some(Self::H6),
            "P" => Some(Self::P),
            "Other" => Some(Self::Other),
            "Unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Map an HTML tag name to a level.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "h1" => Self::H1,
            "h2" => Self::H2,
            "h3" => Self::H3,
            "h4" => Self::H4,
            "h5" => Self::H5,
            "h6" => Self::H6,
            "p" => Self::P,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("probability out of range: {0}")]
    Probability(f64),
    #[error("score out of range: {0}")]
    Score(f64),
}

/// Reject probabilities outside [0, 1].
pub fn validate_prob(prob: f64) -> Result<f64, ScoreError> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(ScoreError::Probability(prob));
    }
    Ok(prob)
}

/// Reject scores outside [-1, 1].
pub fn validate_score(score: f64) -> Result<f64, ScoreError> {
    if !(-1.0..=1.0).contains(&score) {
        return Err(ScoreError::Score(score));
    }
    Ok(score)
}

/// One enriched article body. Exists only for Processed articles.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub article_id: i64,
    pub label: Label,
    pub length: i64,
    pub headline: String,
    pub pos_phrases: i64,
    pub neg_phrases: i64,
    pub pos_sentences: i64,
    pub neg_sentences: i64,
}

#[derive(Debug, Clone)]
pub struct Sentence {
    pub id: i64,
    pub document: i64,
    pub label: Label,
    pub score: f64,
    pub prob: f64,
    pub level: SentenceLevel,
}

#[derive(Debug, Clone)]
pub struct Phrase {
    pub id: i64,
    pub sentence: i64,
    pub label: Label,
    pub score: f64,
    pub prob: f64,
}
