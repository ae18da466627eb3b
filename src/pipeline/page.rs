//! Synchronous HTML analysis for one article.
//!
//! Everything that needs the parse tree happens here in one pass (header
//! scan, anchor collection, date mining) so the tree never crosses an await
//! point. The output is plain owned data.

use scraper::{Html, Selector};

use crate::models::SentenceLevel;
use crate::nlp::{DateContext, DateMiner};

/// One anchor: target and visible text.
#[derive(Debug, Clone)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Tree-derived facts about one page.
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    /// Header texts in headline-scan order (h6 down to h1, document order
    /// within a level).
    pub headers: Vec<(SentenceLevel, String)>,
    pub anchors: Vec<Anchor>,
    pub date_contexts: Vec<DateContext>,
}

/// Parse the body and collect headers, anchors and date contexts.
pub fn analyze(body: &str, miner: &dyn DateMiner) -> PageAnalysis {
    let document = Html::parse_document(body);

    let mut headers = Vec::new();
    // The headline scan runs h6 first, h1 last.
    for tag in ["h6", "h5", "h4", "h3", "h2", "h1"] {
        let selector = Selector::parse(tag).unwrap();
        for element in document.select(&selector) {
            let text: String = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                headers.push((SentenceLevel::from_tag(tag), text));
            }
        }
    }

    let anchor_selector = Selector::parse("a[href]").unwrap();
    let anchors = document
        .select(&anchor_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?.trim().to_string();
            let text: String = element.text().collect::<String>().trim().to_string();
            if href.is_empty() || text.is_empty() {
                return None;
            }
            Some(Anchor { href, text })
        })
        .collect();

    PageAnalysis {
        headers,
        anchors,
        date_contexts: miner.mine(body),
    }
}

/// Pick the headline: the first nonempty header, scanning h6 down to h1,
/// whose text occurs in the cleaned body.
pub fn pick_headline(headers: &[(SentenceLevel, String)], cleaned: &str) -> Option<String> {
    headers
        .iter()
        .find(|(_, text)| cleaned.contains(text.as_str()))
        .map(|(_, text)| text.clone())
}

/// Level a sentence belongs to: the header whose text contains it, else
/// paragraph.
pub fn sentence_level(headers: &[(SentenceLevel, String)], sentence: &str) -> SentenceLevel {
    let sentence = sentence.trim_end_matches(['.', '!', '?']).trim();
    headers
        .iter()
        .find(|(_, text)| text.contains(sentence))
        .map(|(level, _)| *level)
        .unwrap_or(SentenceLevel::P)
}
