//! Keyword extraction for one document.
//!
//! Two outputs from the cleaned text: the bounded keyword set (term
//! extractor output, stop-list filtered, top-K by frequency) and the
//! adjacency list (consecutive proper-noun pairs within a tag run, ranked by
//! summed token frequency, top-K retained).

use std::collections::{HashMap, HashSet};

use crate::models::{validate_keyword, KeywordAdjacency, KeywordError, KeywordSet, KEYWORD_LIMIT};
use crate::nlp::{self, PosTagger, StopList, TermExtractor};

#[derive(Debug)]
pub struct KeywordExtraction {
    pub keyword_set: KeywordSet,
    /// Ranked adjacency pairs, best first.
    pub adjacencies: Vec<KeywordAdjacency>,
    /// Unique words needing interning (set words plus adjacency tokens).
    pub all_words: Vec<String>,
}

pub fn extract(
    cleaned: &str,
    terms: &dyn TermExtractor,
    tagger: &dyn PosTagger,
    stoplist: &StopList,
) -> KeywordExtraction {
    let mut keyword_set = KeywordSet::new();
    for term in terms.extract(cleaned) {
        if stoplist.contains(&term.term) {
            continue;
        }
        match keyword_set.add(&term.term) {
            Ok(_) => {}
            Err(KeywordError::LimitExceeded) => break,
            Err(err) => {
                tracing::debug!("Dropping term {:?}: {}", term.term, err);
            }
        }
    }

    // Token frequencies over the whole text, for ranking pairs.
    let mut frequency: HashMap<String, u32> = HashMap::new();
    for word in nlp::words(cleaned) {
        *frequency.entry(word.to_lowercase()).or_insert(0) += 1;
    }

    let mut pairs: Vec<KeywordAdjacency> = Vec::new();
    let mut seen: HashSet<KeywordAdjacency> = HashSet::new();
    for sentence in nlp::sentences(cleaned) {
        let tokens = nlp::words(sentence);
        let tagged = tagger.tag(&tokens);

        for run in proper_noun_runs(&tagged) {
            if run.len() == 1 {
                push_pair(&mut pairs, &mut seen, &run[0], None);
            } else {
                for window in run.windows(2) {
                    push_pair(&mut pairs, &mut seen, &window[0], Some(&window[1]));
                }
            }
        }
    }

    // Rank by summed token frequency, keep the top K.
    pairs.sort_by_key(|pair| {
        let first = frequency.get(&pair.key1.to_lowercase()).copied().unwrap_or(0);
        let second = pair
            .key2
            .as_deref()
            .and_then(|k| frequency.get(&k.to_lowercase()))
            .copied()
            .unwrap_or(0);
        std::cmp::Reverse(first + second)
    });
    pairs.truncate(KEYWORD_LIMIT);

    let mut all_words: Vec<String> = Vec::new();
    let mut word_seen: HashSet<String> = HashSet::new();
    for word in keyword_set.words() {
        if word_seen.insert(word.clone()) {
            all_words.push(word.clone());
        }
    }
    for pair in &pairs {
        if word_seen.insert(pair.key1.clone()) {
            all_words.push(pair.key1.clone());
        }
        if let Some(key2) = &pair.key2 {
            if word_seen.insert(key2.clone()) {
                all_words.push(key2.clone());
            }
        }
    }

    KeywordExtraction {
        keyword_set,
        adjacencies: pairs,
        all_words,
    }
}

fn push_pair(
    pairs: &mut Vec<KeywordAdjacency>,
    seen: &mut HashSet<KeywordAdjacency>,
    key1: &str,
    key2: Option<&str>,
) {
    let Ok(key1) = validate_keyword(key1) else {
        return;
    };
    let key2 = match key2 {
        Some(word) => match validate_keyword(word) {
            Ok(word) => Some(word),
            Err(_) => return,
        },
        None => None,
    };
    let pair = KeywordAdjacency { key1, key2 };
    if seen.insert(pair.clone()) {
        pairs.push(pair);
    }
}

/// Runs of consecutive NNP tokens within one sentence.
fn proper_noun_runs(tagged: &[crate::nlp::TaggedToken]) -> Vec<Vec<String>> {
    let mut runs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for token in tagged {
        if token.is_proper_noun() {
            current.push(token.token.clone());
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::{FrequencyTermExtractor, HeuristicTagger};

    fn run(cleaned: &str, stoplist: &StopList) -> KeywordExtraction {
        extract(
            cleaned,
            &FrequencyTermExtractor::new(),
            &HeuristicTagger::new(),
            stoplist,
        )
    }

    #[test]
    fn builds_pairs_from_proper_noun_runs() {
        let extraction = run(
            "The new Apple Store opened in London today. Many visited the Apple Store.",
            &StopList::empty(),
        );
        assert!(extraction.adjacencies.contains(&KeywordAdjacency {
            key1: "Apple".to_string(),
            key2: Some("Store".to_string()),
        }));
        // Single-token run yields a pair with an empty second slot.
        assert!(extraction.adjacencies.contains(&KeywordAdjacency {
            key1: "London".to_string(),
            key2: None,
        }));
    }

    #[test]
    fn pairs_are_deduplicated() {
        let extraction = run(
            "Apple Store here. Apple Store there. Apple Store everywhere.",
            &StopList::empty(),
        );
        let apple_store = extraction
            .adjacencies
            .iter()
            .filter(|pair| pair.key1 == "Apple" && pair.key2.as_deref() == Some("Store"))
            .count();
        assert_eq!(apple_store, 1);
    }

    #[test]
    fn stoplisted_words_never_enter_the_set() {
        let stoplist = StopList::from_text("store\n");
        let extraction = run("store store store apple apple", &stoplist);
        assert!(!extraction.keyword_set.contains("store"));
        assert!(extraction.keyword_set.contains("apple"));
    }

    #[test]
    fn keyword_set_is_bounded() {
        let text: String = (0..100)
            .map(|i| format!("unique{:03} ", i))
            .collect::<String>()
            .repeat(2);
        let extraction = run(&text, &StopList::empty());
        assert!(extraction.keyword_set.len() <= KEYWORD_LIMIT);
        assert!(extraction.adjacencies.len() <= KEYWORD_LIMIT);
    }

    #[test]
    fn all_words_cover_set_and_pairs() {
        let extraction = run(
            "Apple Store sales grew strongly in London.",
            &StopList::empty(),
        );
        for pair in &extraction.adjacencies {
            assert!(extraction.all_words.contains(&pair.key1));
            if let Some(key2) = &pair.key2 {
                assert!(extraction.all_words.contains(key2));
            }
        }
        for word in extraction.keyword_set.words() {
            assert!(extraction.all_words.contains(word));
        }
    }
}
