use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::config::{resolve_relative, AppConfig};
use crate::models::ChatModelConfig;
use crate::pipeline::prompts::{default_prompt_files, PromptSet, DEFAULT_PROMPTS_DIR};
use crate::pipeline::translate::TranslatorProvider;

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_DICTIONARY: &str = "cedict_ts.u8";
pub const DEFAULT_MODEL_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "qwen/qwen-2.5-72b-instruct:free";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Startup overrides; CLI flags first, then `READASSIST_*` environment variables.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub dictionary: Option<PathBuf>,
    pub model_url: Option<String>,
    pub model: Option<String>,
    pub translator: Option<String>,
}

impl ConfigOverrides {
    /// Fill unset fields from `READASSIST_*` variables read through `lookup`; blank values count
    /// as unset.
    #[must_use]
    pub fn with_env(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env = |k: &str| {
            lookup(k)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            bind: self.bind.or_else(|| env("READASSIST_BIND")),
            dictionary: self
                .dictionary
                .or_else(|| env("READASSIST_DICTIONARY").map(PathBuf::from)),
            model_url: self.model_url.or_else(|| env("READASSIST_MODEL_URL")),
            model: self.model.or_else(|| env("READASSIST_MODEL")),
            translator: self.translator.or_else(|| env("READASSIST_TRANSLATOR")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub bind: String,
    pub cors_origin: String,
    pub dictionary_path: PathBuf,

    pub source_lang: String,
    pub target_lang: String,
    pub max_concurrent_disambiguations: usize,
    pub disambiguation_timeout: Duration,
    /// Ceiling on all disambiguation work of one request, permit waits included.
    pub disambiguation_deadline: Duration,
    pub translation_timeout: Duration,
    pub strict_sense_match: bool,
    pub log_max_chars: usize,

    pub translator_provider: TranslatorProvider,
    pub translator_url: Option<String>,
    pub translator_api_key: Option<String>,
    pub translator_model: ChatModelConfig,

    pub sense_model: ChatModelConfig,

    pub prompts: PromptSet,
}

impl PipelineConfig {
    pub fn from_app_config(
        file_cfg: &AppConfig,
        cfg_path: &Path,
        overrides: &ConfigOverrides,
    ) -> anyhow::Result<Self> {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let bind = overrides
            .bind
            .clone()
            .or_else(|| non_empty(&file_cfg.server.bind))
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let cors_origin = non_empty(&file_cfg.server.cors_origin)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string());

        let dictionary_path = match overrides.dictionary.clone() {
            Some(p) => p,
            None => resolve_relative(
                cfg_path,
                file_cfg
                    .dictionary
                    .path
                    .as_deref()
                    .unwrap_or_else(|| Path::new(DEFAULT_DICTIONARY)),
            ),
        };

        let p = &file_cfg.pipeline;
        let source_lang = non_empty(&p.source_lang).unwrap_or_else(|| "zh".to_string());
        let target_lang = non_empty(&p.target_lang).unwrap_or_else(|| "en".to_string());
        let max_concurrent_disambiguations = p.max_concurrent_disambiguations.unwrap_or(4).max(1);
        let disambiguation_timeout =
            Duration::from_secs(p.disambiguation_timeout_secs.unwrap_or(20).max(1));
        let disambiguation_deadline = Duration::from_secs(
            p.disambiguation_deadline_secs
                .unwrap_or(60)
                .max(disambiguation_timeout.as_secs()),
        );
        let translation_timeout =
            Duration::from_secs(p.translation_timeout_secs.unwrap_or(15).max(1));
        let strict_sense_match = p.strict_sense_match.unwrap_or(false);
        let log_max_chars = p.log_max_chars.unwrap_or(120);

        let m = &file_cfg.model;
        let base_url = overrides
            .model_url
            .clone()
            .or_else(|| non_empty(&m.base_url))
            .unwrap_or_else(|| DEFAULT_MODEL_URL.to_string());
        let model = overrides
            .model
            .clone()
            .or_else(|| non_empty(&m.model))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_key_env =
            non_empty(&m.api_key_env).unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = read_secret(&api_key_env);
        let sense_model = ChatModelConfig {
            name: "sense-model".to_string(),
            base_url: base_url.clone(),
            model: model.clone(),
            api_key: api_key.clone(),
            temperature: m.temperature.unwrap_or(0.0),
            max_tokens: m.max_tokens.unwrap_or(64),
            timeout: disambiguation_timeout,
        };

        let t = &file_cfg.translator;
        let translator_provider = TranslatorProvider::parse(
            overrides
                .translator
                .as_deref()
                .or(t.provider.as_deref()),
        )?;
        let translator_url = non_empty(&t.url);
        if translator_provider == TranslatorProvider::LibreTranslate && translator_url.is_none() {
            anyhow::bail!("translator provider libretranslate requires [translator].url");
        }
        let translator_api_key = non_empty(&t.api_key_env).and_then(|k| read_secret(&k));
        let translator_model = ChatModelConfig {
            name: "translator".to_string(),
            base_url,
            model: non_empty(&t.model).unwrap_or(model),
            api_key,
            temperature: 0.2,
            max_tokens: 512,
            timeout: translation_timeout,
        };

        let prompts = PromptSet::load(cfg_path, file_cfg).context("load prompts")?;

        Ok(Self {
            bind,
            cors_origin,
            dictionary_path,
            source_lang,
            target_lang,
            max_concurrent_disambiguations,
            disambiguation_timeout,
            disambiguation_deadline,
            translation_timeout,
            strict_sense_match,
            log_max_chars,
            translator_provider,
            translator_url,
            translator_api_key,
            translator_model,
            sense_model,
            prompts,
        })
    }
}

fn read_secret(env_name: &str) -> Option<String> {
    let v = std::env::var(env_name).ok()?;
    let v = v.trim();
    if v.is_empty() {
        log::debug!("{env_name} is empty");
        return None;
    }
    Some(v.to_string())
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(crate::config::DEFAULT_CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;

    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[server]
bind = "127.0.0.1:5000"
cors_origin = "http://localhost:5173"

[pipeline]
source_lang = "zh"
target_lang = "en"
# Upper bound on model calls in flight across all requests.
max_concurrent_disambiguations = 4
disambiguation_timeout_secs = 20
# Upper bound on the whole disambiguation phase of one request, including waits for a slot.
disambiguation_deadline_secs = 60
translation_timeout_secs = 15
# When true, a model reply that names none of the candidates is treated as a failure.
strict_sense_match = false
log_max_chars = 120

[dictionary]
# CC-CEDICT (https://www.mdbg.net/chinese/dictionary?page=cedict), relative to this file.
path = "cedict_ts.u8"

[translator]
# "llm" (uses [model]), "libretranslate" or "disabled".
provider = "llm"
# url = "http://localhost:5001"
# api_key_env = "LIBRETRANSLATE_API_KEY"
# model = "qwen/qwen-2.5-72b-instruct:free"

[model]
# Any OpenAI-compatible endpoint: OpenRouter, Ollama (http://localhost:11434/v1), LM Studio...
base_url = "https://openrouter.ai/api/v1"
model = "qwen/qwen-2.5-72b-instruct:free"
api_key_env = "OPENROUTER_API_KEY"
temperature = 0.0
max_tokens = 64

[prompts]
disambiguate_system = "prompts/disambiguate_system.txt"
disambiguate_user = "prompts/disambiguate_user.txt"
translate_system = "prompts/translate_system.txt"
translate_user = "prompts/translate_user.txt"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config;

    #[test]
    fn defaults_without_config_file() {
        let cfg = PipelineConfig::from_app_config(
            &AppConfig::default(),
            Path::new("/srv/readassist/readassist.toml"),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.source_lang, "zh");
        assert_eq!(cfg.target_lang, "en");
        assert_eq!(cfg.max_concurrent_disambiguations, 4);
        assert_eq!(cfg.disambiguation_timeout, Duration::from_secs(20));
        assert_eq!(cfg.disambiguation_deadline, Duration::from_secs(60));
        assert_eq!(cfg.translator_provider, TranslatorProvider::Llm);
        assert_eq!(
            cfg.dictionary_path,
            PathBuf::from("/srv/readassist/cedict_ts.u8")
        );
        assert_eq!(cfg.sense_model.model, DEFAULT_MODEL);
    }

    #[test]
    fn overrides_win_over_file() {
        let mut file_cfg = AppConfig::default();
        file_cfg.model.model = Some("file-model".into());
        file_cfg.pipeline.max_concurrent_disambiguations = Some(0);
        let overrides = ConfigOverrides {
            model: Some("cli-model".into()),
            translator: Some("disabled".into()),
            ..Default::default()
        };
        let cfg = PipelineConfig::from_app_config(
            &file_cfg,
            Path::new("readassist.toml"),
            &overrides,
        )
        .unwrap();
        assert_eq!(cfg.sense_model.model, "cli-model");
        assert_eq!(cfg.translator_provider, TranslatorProvider::Disabled);
        assert_eq!(cfg.max_concurrent_disambiguations, 1);
    }

    #[test]
    fn env_fills_only_what_the_cli_left_unset() {
        let env = |k: &str| match k {
            "READASSIST_BIND" => Some("0.0.0.0:9000".to_string()),
            "READASSIST_MODEL" => Some("env-model".to_string()),
            "READASSIST_MODEL_URL" => Some("http://localhost:11434/v1".to_string()),
            "READASSIST_DICTIONARY" => Some("/data/cedict.u8".to_string()),
            "READASSIST_TRANSLATOR" => Some("   ".to_string()),
            _ => None,
        };
        let overrides = ConfigOverrides {
            model: Some("cli-model".into()),
            ..Default::default()
        }
        .with_env(env);

        assert_eq!(overrides.model.as_deref(), Some("cli-model"));
        assert_eq!(overrides.bind.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(
            overrides.model_url.as_deref(),
            Some("http://localhost:11434/v1")
        );
        assert_eq!(overrides.dictionary, Some(PathBuf::from("/data/cedict.u8")));
        assert_eq!(overrides.translator, None);
    }

    #[test]
    fn env_overrides_beat_the_config_file() {
        let mut file_cfg = AppConfig::default();
        file_cfg.server.bind = Some("127.0.0.1:7000".into());
        file_cfg.translator.provider = Some("llm".into());
        file_cfg.model.base_url = Some("http://file".into());
        let overrides = ConfigOverrides::default().with_env(|k| match k {
            "READASSIST_BIND" => Some("127.0.0.1:8000".to_string()),
            "READASSIST_TRANSLATOR" => Some("disabled".to_string()),
            _ => None,
        });

        let cfg = PipelineConfig::from_app_config(
            &file_cfg,
            Path::new("readassist.toml"),
            &overrides,
        )
        .unwrap();
        assert_eq!(cfg.bind, "127.0.0.1:8000");
        assert_eq!(cfg.translator_provider, TranslatorProvider::Disabled);
        assert_eq!(cfg.sense_model.base_url, "http://file");
    }

    #[test]
    fn deadline_never_undercuts_the_per_call_timeout() {
        let mut file_cfg = AppConfig::default();
        file_cfg.pipeline.disambiguation_timeout_secs = Some(30);
        file_cfg.pipeline.disambiguation_deadline_secs = Some(5);
        let cfg = PipelineConfig::from_app_config(
            &file_cfg,
            Path::new("readassist.toml"),
            &ConfigOverrides::default(),
        )
        .unwrap();
        assert_eq!(cfg.disambiguation_deadline, Duration::from_secs(30));
    }

    #[test]
    fn libretranslate_requires_url() {
        let mut file_cfg = AppConfig::default();
        file_cfg.translator.provider = Some("libretranslate".into());
        assert!(PipelineConfig::from_app_config(
            &file_cfg,
            Path::new("readassist.toml"),
            &ConfigOverrides::default()
        )
        .is_err());
    }

    #[test]
    fn init_config_writes_loadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = init_default_config(dir.path(), false).unwrap();
        let file_cfg = load_config(&cfg_path).unwrap();
        let cfg =
            PipelineConfig::from_app_config(&file_cfg, &cfg_path, &ConfigOverrides::default())
                .unwrap();
        assert_eq!(cfg.cors_origin, DEFAULT_CORS_ORIGIN);
        assert!(cfg.prompts.disambiguate_user.contains("{{token}}"));
        assert_eq!(cfg.dictionary_path, dir.path().join("cedict_ts.u8"));
    }
}
