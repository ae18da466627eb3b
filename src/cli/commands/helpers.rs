//! Shared wiring for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use crate::classify::LexiconClassifier;
use crate::config::Settings;
use crate::extract::HttpTextExtractor;
use crate::nlp::{
    FrequencyTermExtractor, HeuristicTagger, RegexDateMiner, StopList, WhatlangDetector,
};
use crate::pipeline::PipelineServices;
use crate::queue::{DbQueue, MessageQueue};
use crate::repository::DbContext;
use crate::store::{FsObjectStore, ObjectStore};

pub async fn db_context(settings: &Settings) -> anyhow::Result<DbContext> {
    Ok(DbContext::connect(&settings.database_url).await?)
}

pub fn object_store(settings: &Settings) -> Arc<dyn ObjectStore> {
    Arc::new(FsObjectStore::new(&settings.object_store_dir()))
}

pub fn queue(ctx: &DbContext, settings: &Settings, name: &str) -> Arc<dyn MessageQueue> {
    Arc::new(DbQueue::new(
        ctx.pool().clone(),
        name,
        Duration::from_secs(settings.visibility_timeout),
    ))
}

/// Assemble the pipeline's collaborators from the settings.
pub fn pipeline_services(settings: &Settings) -> anyhow::Result<PipelineServices> {
    let stoplist = match &settings.stoplist_path {
        Some(path) => StopList::load(path)?,
        None => StopList::empty(),
    };
    let classifier = match &settings.lexicon_path {
        Some(path) => LexiconClassifier::load(path)?,
        None => LexiconClassifier::new(),
    };

    Ok(PipelineServices {
        extractor: Arc::new(HttpTextExtractor::new(
            &settings.extractor_url,
            Duration::from_secs(settings.request_timeout),
        )?),
        classifier: Arc::new(classifier),
        language: Arc::new(WhatlangDetector::new()),
        tagger: Arc::new(HeuristicTagger::new()),
        terms: Arc::new(FrequencyTermExtractor::new()),
        miner: Arc::new(RegexDateMiner::new()),
        stoplist: Arc::new(stoplist),
    })
}
