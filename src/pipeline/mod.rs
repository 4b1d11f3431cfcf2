mod assemble;
mod config;
mod disambiguate;
mod enricher;
mod prompts;
mod reduce;
mod segment;
mod translate;

pub use assemble::assemble;
pub use config::{init_default_config, ConfigOverrides, PipelineConfig};
pub use disambiguate::{interpret_reply, ChatSenseModel, Disambiguator, SenseModel};
pub use enricher::{EnrichmentPipeline, EnrichmentSettings};
pub use prompts::{render_template, PromptSet};
pub use reduce::reduce;
pub use segment::{segment_sentence, SegmentedSentence, SegmentedToken, Segmentation, Segmenter};
pub use translate::{
    translate_sentence, ChatTranslator, DisabledTranslator, LibreTranslator, Translator,
    TranslatorProvider,
};
