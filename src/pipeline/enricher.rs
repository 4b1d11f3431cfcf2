use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::dictionary::{CedictDictionary, CedictSegmenter};
use crate::error::PipelineError;
use crate::ir::{EnrichedResult, TokenEntry};
use crate::models::ChatClient;
use crate::textutil::truncate_chars;

use super::assemble::assemble;
use super::config::PipelineConfig;
use super::disambiguate::{ChatSenseModel, Disambiguator};
use super::reduce::reduce;
use super::segment::{segment_sentence, Segmenter};
use super::translate::{
    translate_sentence, ChatTranslator, DisabledTranslator, LibreTranslator, Translator,
    TranslatorProvider,
};

#[derive(Clone, Debug)]
pub struct EnrichmentSettings {
    pub source_lang: String,
    pub target_lang: String,
    pub translation_timeout: Duration,
    pub log_max_chars: usize,
}

impl Default for EnrichmentSettings {
    fn default() -> Self {
        Self {
            source_lang: "zh".to_string(),
            target_lang: "en".to_string(),
            translation_timeout: Duration::from_secs(15),
            log_max_chars: 120,
        }
    }
}

/// Sentence in, enriched result out.
///
/// Segmentation and reduction run first; translation of the whole sentence and per-token
/// disambiguation then run concurrently. Neither collaborator failure aborts the request.
pub struct EnrichmentPipeline {
    segmenter: Arc<dyn Segmenter>,
    translator: Arc<dyn Translator>,
    disambiguator: Disambiguator,
    settings: EnrichmentSettings,
}

impl EnrichmentPipeline {
    pub fn new(
        segmenter: Arc<dyn Segmenter>,
        translator: Arc<dyn Translator>,
        disambiguator: Disambiguator,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            segmenter,
            translator,
            disambiguator,
            settings,
        }
    }

    /// Build the production pipeline: CEDICT segmentation, the configured translator and the
    /// chat-backed sense model.
    pub fn from_config(
        cfg: &PipelineConfig,
        dictionary: Arc<CedictDictionary>,
    ) -> anyhow::Result<Self> {
        let segmenter: Arc<dyn Segmenter> = Arc::new(CedictSegmenter::new(dictionary));

        let translator: Arc<dyn Translator> = match cfg.translator_provider {
            TranslatorProvider::Llm => {
                let client = ChatClient::new(cfg.translator_model.clone())
                    .context("build translation client")?;
                Arc::new(ChatTranslator::new(
                    Arc::new(client),
                    cfg.prompts.translate_system.clone(),
                    cfg.prompts.translate_user.clone(),
                ))
            }
            TranslatorProvider::LibreTranslate => {
                let url = cfg
                    .translator_url
                    .clone()
                    .context("libretranslate provider needs a url")?;
                Arc::new(LibreTranslator::new(
                    url,
                    cfg.translator_api_key.clone(),
                    cfg.translation_timeout,
                )?)
            }
            TranslatorProvider::Disabled => Arc::new(DisabledTranslator),
        };

        let sense_client =
            ChatClient::new(cfg.sense_model.clone()).context("build sense model client")?;
        let sense_model = ChatSenseModel::new(
            Arc::new(sense_client),
            cfg.prompts.disambiguate_system.clone(),
            cfg.prompts.disambiguate_user.clone(),
        );
        let disambiguator = Disambiguator::new(
            Arc::new(sense_model),
            cfg.max_concurrent_disambiguations,
            cfg.disambiguation_timeout,
            cfg.strict_sense_match,
        )
        .with_request_deadline(cfg.disambiguation_deadline);

        log::info!(
            "pipeline ready: translator={:?} sense_model={} concurrency={}",
            cfg.translator_provider,
            cfg.sense_model.model,
            cfg.max_concurrent_disambiguations
        );

        Ok(Self::new(
            segmenter,
            translator,
            disambiguator,
            EnrichmentSettings {
                source_lang: cfg.source_lang.clone(),
                target_lang: cfg.target_lang.clone(),
                translation_timeout: cfg.translation_timeout,
                log_max_chars: cfg.log_max_chars,
            },
        ))
    }

    pub async fn run(&self, sentence: &str) -> Result<EnrichedResult, PipelineError> {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            return Err(PipelineError::no_input());
        }
        let started = Instant::now();
        log::info!(
            "enrich: {}",
            truncate_chars(sentence, self.settings.log_max_chars)
        );

        let segmented = segment_sentence(self.segmenter.as_ref(), sentence)?;
        let tokens: Vec<String> = segmented
            .records
            .iter()
            .map(|r| r.surface_form().to_string())
            .collect();
        let mut entries: Vec<TokenEntry> = segmented.records.iter().map(reduce).collect();

        let (translation, calls) = tokio::join!(
            translate_sentence(
                self.translator.as_ref(),
                sentence,
                &self.settings.source_lang,
                &self.settings.target_lang,
                self.settings.translation_timeout,
            ),
            self.disambiguator
                .disambiguate_entries(&tokens, &mut entries, sentence),
        );

        let mut warnings = Vec::new();
        let translation = match translation {
            Ok(text) => Some(text),
            Err(err) => {
                log::warn!("translation failed: {err}");
                warnings.push(format!("translation unavailable: {err}"));
                None
            }
        };
        let failed = entries
            .iter()
            .filter(|e| e.disambiguation_error.is_some())
            .count();

        let result = assemble(
            tokens.into_iter().zip(entries).collect(),
            translation,
            segmented.raw,
            warnings,
        )?;

        log::info!(
            "enriched {} tokens ({} model calls, {} failed) in {} ms",
            result.token_order.len(),
            calls,
            failed,
            started.elapsed().as_millis()
        );
        Ok(result)
    }
}
