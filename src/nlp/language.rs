//! Language identification seam.

pub trait LanguageDetector: Send + Sync {
    /// Returns the ISO language code and a certainty in [0, 1].
    fn detect(&self, text: &str) -> Option<(String, f64)>;
}

/// whatlang-backed detector. English reports as "en"; everything else
/// reports its ISO 639-3 code.
#[derive(Debug, Default)]
pub struct WhatlangDetector;

impl WhatlangDetector {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Option<(String, f64)> {
        let info = whatlang::detect(text)?;
        let code = match info.lang() {
            whatlang::Lang::Eng => "en".to_string(),
            other => other.code().to_string(),
        };
        Some((code, info.confidence()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_english() {
        let detector = WhatlangDetector::new();
        let (code, certainty) = detector
            .detect("The quick brown fox jumps over the lazy dog and keeps on running through the field.")
            .unwrap();
        assert_eq!(code, "en");
        assert!(certainty > 0.0);
    }

    #[test]
    fn detects_french_as_not_english() {
        let detector = WhatlangDetector::new();
        let (code, _) = detector
            .detect("Le renard brun rapide saute par-dessus le chien paresseux et continue de courir.")
            .unwrap();
        assert_ne!(code, "en");
    }
}
