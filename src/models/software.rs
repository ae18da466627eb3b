//! Software provenance: which component versions touched a document.

/// Maximum stored version-string length.
pub const MAX_SOFTWARE_LENGTH: usize = 256;

/// Validate a component version string, returning the trimmed value.
///
/// Version strings can originate from external services (the extractor's
/// XML envelope), so they are bounded like every other stored field:
/// nonempty after trimming, truncated to the column width.
pub fn validate_software_version(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(value.chars().take(MAX_SOFTWARE_LENGTH).collect())
}

/// What a component did to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwareAction {
    Classified,
    Dated,
    Processed,
    Extracted,
    Other,
}

impl SoftwareAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classified => "Classified",
            Self::Dated => "Dated",
            Self::Processed => "Processed",
            Self::Extracted => "Extracted",
            Self::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Classified" => Some(Self::Classified),
            "Dated" => Some(Self::Dated),
            "Processed" => Some(Self::Processed),
            "Extracted" => Some(Self::Extracted),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A unique component version string.
#[derive(Debug, Clone)]
pub struct SoftwareVersion {
    pub id: i64,
    pub software: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_strings_are_trimmed_and_bounded() {
        assert_eq!(
            validate_software_version(" boilerpipe/1.2.0 "),
            Some("boilerpipe/1.2.0".to_string())
        );
        assert_eq!(validate_software_version("   "), None);

        let long = "x".repeat(400);
        let stored = validate_software_version(&long).unwrap();
        assert_eq!(stored.len(), MAX_SOFTWARE_LENGTH);
    }

    #[test]
    fn action_round_trips() {
        for action in [
            SoftwareAction::Classified,
            SoftwareAction::Dated,
            SoftwareAction::Processed,
            SoftwareAction::Extracted,
            SoftwareAction::Other,
        ] {
            assert_eq!(SoftwareAction::parse(action.as_str()), Some(action));
        }
    }
}
