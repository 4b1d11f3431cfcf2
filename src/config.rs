use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "readassist.toml";
pub const CONFIG_ENV: &str = "READASSIST_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub dictionary: DictionarySection,
    #[serde(default)]
    pub translator: TranslatorSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ServerSection {
    #[serde(default)]
    pub bind: Option<String>,
    /// Browser origin allowed by CORS (the web front end).
    #[serde(default)]
    pub cors_origin: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub source_lang: Option<String>,
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub max_concurrent_disambiguations: Option<usize>,
    #[serde(default)]
    pub disambiguation_timeout_secs: Option<u64>,
    #[serde(default)]
    pub disambiguation_deadline_secs: Option<u64>,
    #[serde(default)]
    pub translation_timeout_secs: Option<u64>,
    /// Reject model replies that do not name one of the candidate definitions.
    #[serde(default)]
    pub strict_sense_match: Option<bool>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DictionarySection {
    /// CC-CEDICT file; relative paths resolve against the config file directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TranslatorSection {
    /// "llm", "libretranslate" or "disabled".
    #[serde(default)]
    pub provider: Option<String>,
    /// LibreTranslate base URL.
    #[serde(default)]
    pub url: Option<String>,
    /// Name of the environment variable holding the LibreTranslate API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model id used by the "llm" provider; defaults to `[model].model`.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ModelSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub disambiguate_system: Option<String>,
    #[serde(default)]
    pub disambiguate_user: Option<String>,
    #[serde(default)]
    pub translate_system: Option<String>,
    #[serde(default)]
    pub translate_user: Option<String>,
}

pub fn find_default_config(filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

/// Explicit path, then `$READASSIST_CONFIG` (read through `lookup`), then an upward search for
/// `readassist.toml`. Returns the loaded config (default when no file exists) and the path it is
/// anchored at.
pub fn discover_config(
    explicit: Option<PathBuf>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(AppConfig, PathBuf)> {
    let cfg_file = explicit
        .or_else(|| {
            lookup(CONFIG_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(|v| PathBuf::from(v.trim()))
        })
        .or_else(|| find_default_config(DEFAULT_CONFIG_FILENAME));
    match cfg_file {
        Some(p) if p.exists() => {
            let cfg = load_config(&p)?;
            log::info!("Config: {}", p.display());
            Ok((cfg, p))
        }
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            log::info!("No {DEFAULT_CONFIG_FILENAME} found; using defaults");
            Ok((AppConfig::default(), cwd.join(DEFAULT_CONFIG_FILENAME)))
        }
    }
}

/// Resolve `p` against the directory of `config_path` when relative.
pub fn resolve_relative(config_path: &Path, p: &Path) -> PathBuf {
    if p.is_relative() {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(p)
    } else {
        p.to_path_buf()
    }
}
