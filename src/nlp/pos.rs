//! Part-of-speech tagging seam.
//!
//! The pipeline only cares about NNP (proper noun) runs; the bundled tagger
//! is a capitalization heuristic, with the real tagger injectable behind the
//! trait.

/// A token with its assigned tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub token: String,
    pub tag: String,
}

impl TaggedToken {
    pub fn is_proper_noun(&self) -> bool {
        self.tag == "NNP"
    }
}

pub trait PosTagger: Send + Sync {
    /// Tag one sentence's tokens, in order.
    fn tag(&self, tokens: &[&str]) -> Vec<TaggedToken>;
}

/// Capitalization-based tagger.
///
/// A token is NNP when it starts with an uppercase letter and is not the
/// sentence opener, or is the opener and fully capitalized beyond its first
/// letter elsewhere in the sentence (acronyms).
#[derive(Debug, Default)]
pub struct HeuristicTagger;

impl HeuristicTagger {
    pub fn new() -> Self {
        Self
    }
}

impl PosTagger for HeuristicTagger {
    fn tag(&self, tokens: &[&str]) -> Vec<TaggedToken> {
        tokens
            .iter()
            .enumerate()
            .map(|(index, token)| {
                let tag = if token.chars().all(|c| c.is_ascii_digit()) {
                    "CD"
                } else if looks_proper(token, index == 0) {
                    "NNP"
                } else {
                    "NN"
                };
                TaggedToken {
                    token: (*token).to_string(),
                    tag: tag.to_string(),
                }
            })
            .collect()
    }
}

fn looks_proper(token: &str, sentence_initial: bool) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_uppercase() {
        return false;
    }
    if !sentence_initial {
        return true;
    }
    // Sentence openers are capitalized anyway; only treat acronyms as proper.
    token.len() > 1 && token.chars().all(|c| c.is_uppercase() || c.is_ascii_digit())
}
