//! Linguistic service seams.
//!
//! Sentence/word tokenization, part-of-speech tagging, noun-phrase term
//! extraction, language identification, and date mining sit behind traits so
//! the pipeline can be driven by deterministic fakes in tests.

mod dates;
mod language;
mod pos;
mod stoplist;
mod terms;
mod tokenize;

pub use dates::{DateContext, DateMiner, MinedDate, RegexDateMiner};
pub use language::{LanguageDetector, WhatlangDetector};
pub use pos::{HeuristicTagger, PosTagger, TaggedToken};
pub use stoplist::StopList;
pub use terms::{FrequencyTermExtractor, Term, TermExtractor};
pub use tokenize::{sentences, words};
