use std::path::Path;

use anyhow::{anyhow, Context};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::{resolve_relative, AppConfig};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("placeholder regex"));

pub const DEFAULT_PROMPTS_DIR: &str = "prompts";

pub const DEFAULT_DISAMBIGUATE_SYSTEM: &str = "disambiguate_system.txt";
pub const DEFAULT_DISAMBIGUATE_USER: &str = "disambiguate_user.txt";
pub const DEFAULT_TRANSLATE_SYSTEM: &str = "translate_system.txt";
pub const DEFAULT_TRANSLATE_USER: &str = "translate_user.txt";

#[derive(Clone, Debug)]
pub struct PromptSet {
    pub disambiguate_system: String,
    pub disambiguate_user: String,
    pub translate_system: String,
    pub translate_user: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            disambiguate_system: DEFAULT_DISAMBIGUATE_SYSTEM_TEXT.to_string(),
            disambiguate_user: DEFAULT_DISAMBIGUATE_USER_TEXT.to_string(),
            translate_system: DEFAULT_TRANSLATE_SYSTEM_TEXT.to_string(),
            translate_user: DEFAULT_TRANSLATE_USER_TEXT.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in templates, replaced by any file configured under `[prompts]`.
    pub fn load(config_path: &Path, cfg: &AppConfig) -> anyhow::Result<Self> {
        let p = &cfg.prompts;
        let defaults = Self::default();
        Ok(Self {
            disambiguate_system: read_prompt(
                config_path,
                "disambiguate_system",
                p.disambiguate_system.as_deref(),
                defaults.disambiguate_system,
            )?,
            disambiguate_user: read_prompt(
                config_path,
                "disambiguate_user",
                p.disambiguate_user.as_deref(),
                defaults.disambiguate_user,
            )?,
            translate_system: read_prompt(
                config_path,
                "translate_system",
                p.translate_system.as_deref(),
                defaults.translate_system,
            )?,
            translate_user: read_prompt(
                config_path,
                "translate_user",
                p.translate_user.as_deref(),
                defaults.translate_user,
            )?,
        })
    }
}

fn read_prompt(
    config_path: &Path,
    key: &str,
    configured: Option<&str>,
    fallback: String,
) -> anyhow::Result<String> {
    let Some(rel) = configured.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(fallback);
    };
    let p = resolve_relative(config_path, Path::new(rel));
    if !p.exists() {
        return Err(anyhow!(
            "prompt file not found for {key}: {} (run: readassist --init-config)",
            p.display()
        ));
    }
    std::fs::read_to_string(&p).with_context(|| format!("read prompt: {}", p.display()))
}

/// Fill `{{name}}` placeholders in one pass; substituted values are never rescanned and
/// unknown placeholders are left as written.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            vars.iter()
                .find(|(k, _)| *k == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, v)| (*v).to_string())
        })
        .into_owned()
}

pub fn default_prompt_files() -> Vec<(&'static str, &'static str)> {
    vec![
        (DEFAULT_DISAMBIGUATE_SYSTEM, DEFAULT_DISAMBIGUATE_SYSTEM_TEXT),
        (DEFAULT_DISAMBIGUATE_USER, DEFAULT_DISAMBIGUATE_USER_TEXT),
        (DEFAULT_TRANSLATE_SYSTEM, DEFAULT_TRANSLATE_SYSTEM_TEXT),
        (DEFAULT_TRANSLATE_USER, DEFAULT_TRANSLATE_USER_TEXT),
    ]
}

pub const DEFAULT_DISAMBIGUATE_SYSTEM_TEXT: &str = r#"You are a Mandarin language expert.
You will be given a Mandarin sentence, one word (词语) taken from it, and the dictionary definitions of that word.
Choose the SINGLE definition that fits the word as it is used in the sentence.

Rules:
- Copy the chosen definition EXACTLY as it is listed.
- Output ONLY the definition. No explanation, no numbering, no quotes, no markdown."#;

pub const DEFAULT_DISAMBIGUATE_USER_TEXT: &str = r#"Sentence: {{sentence}}
Word: {{token}}
Definitions: {{definitions}}"#;

pub const DEFAULT_TRANSLATE_SYSTEM_TEXT: &str = r#"You are a professional translator.
Translate the given text accurately while preserving its tone.
Do not add explanations or notes. Only output the translated text."#;

pub const DEFAULT_TRANSLATE_USER_TEXT: &str = r#"Translate from {{source_lang}} to {{target_lang}}:

{{text}}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_all_placeholders() {
        let out = render_template(
            DEFAULT_DISAMBIGUATE_USER_TEXT,
            &[
                ("sentence", "我爱看书"),
                ("token", "爱"),
                ("definitions", "to love / to like"),
            ],
        );
        assert_eq!(
            out,
            "Sentence: 我爱看书\nWord: 爱\nDefinitions: to love / to like"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let out = render_template(
            DEFAULT_DISAMBIGUATE_USER_TEXT,
            &[
                ("sentence", "我说{{definitions}}"),
                ("token", "说"),
                ("definitions", "to say / to speak"),
            ],
        );
        assert_eq!(
            out,
            "Sentence: 我说{{definitions}}\nWord: 说\nDefinitions: to say / to speak"
        );
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        assert_eq!(
            render_template("{{token}} {{other}}", &[("token", "看")]),
            "看 {{other}}"
        );
    }

    #[test]
    fn configured_prompt_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("readassist.toml");
        std::fs::create_dir_all(dir.path().join(DEFAULT_PROMPTS_DIR)).unwrap();
        std::fs::write(
            dir.path().join("prompts/custom.txt"),
            "Pick one for {{token}}",
        )
        .unwrap();

        let mut cfg = AppConfig::default();
        cfg.prompts.disambiguate_user = Some("prompts/custom.txt".into());
        let set = PromptSet::load(&cfg_path, &cfg).unwrap();
        assert_eq!(set.disambiguate_user, "Pick one for {{token}}");
        assert_eq!(set.translate_user, DEFAULT_TRANSLATE_USER_TEXT);
    }

    #[test]
    fn missing_configured_prompt_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.prompts.translate_system = Some("prompts/nope.txt".into());
        assert!(PromptSet::load(&dir.path().join("readassist.toml"), &cfg).is_err());
    }
}
