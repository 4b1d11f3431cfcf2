use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TranslationError;
use crate::models::ChatClient;
use crate::textutil::truncate_chars;

use super::prompts::render_template;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        sentence: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError>;
}

/// Runs one translation under `timeout`; blank output counts as a failure.
pub async fn translate_sentence(
    translator: &dyn Translator,
    sentence: &str,
    source_lang: &str,
    target_lang: &str,
    timeout: Duration,
) -> Result<String, TranslationError> {
    let text = tokio::time::timeout(
        timeout,
        translator.translate(sentence, source_lang, target_lang),
    )
    .await
    .map_err(|_| TranslationError::Timeout(timeout))??;
    let text = text.trim();
    if text.is_empty() {
        return Err(TranslationError::EmptyResponse);
    }
    Ok(text.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslatorProvider {
    Llm,
    LibreTranslate,
    Disabled,
}

impl TranslatorProvider {
    pub fn parse(s: Option<&str>) -> anyhow::Result<Self> {
        match s.unwrap_or("llm").trim().to_ascii_lowercase().as_str() {
            "llm" | "model" => Ok(Self::Llm),
            "libretranslate" | "libre" => Ok(Self::LibreTranslate),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => anyhow::bail!("unknown translator provider: {other}"),
        }
    }
}

pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
        Err(TranslationError::Disabled)
    }
}

/// Translation through the chat-completions model.
pub struct ChatTranslator {
    client: Arc<ChatClient>,
    system_prompt: String,
    user_template: String,
}

impl ChatTranslator {
    pub fn new(client: Arc<ChatClient>, system_prompt: String, user_template: String) -> Self {
        Self {
            client,
            system_prompt,
            user_template,
        }
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate(
        &self,
        sentence: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let user = render_template(
            &self.user_template,
            &[
                ("source_lang", source_lang),
                ("target_lang", target_lang),
                ("text", sentence),
            ],
        );
        Ok(self.client.chat(Some(&self.system_prompt), &user).await?)
    }
}

/// LibreTranslate-compatible `POST {url}/translate`.
pub struct LibreTranslator {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct LibreResponse {
    #[serde(default, rename = "translatedText")]
    translated_text: String,
}

impl LibreTranslator {
    pub fn new(url: String, api_key: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build translator http client")?;
        Ok(Self {
            http,
            url,
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl Translator for LibreTranslator {
    async fn translate(
        &self,
        sentence: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let url = format!("{}/translate", self.url.trim_end_matches('/'));
        let body = LibreRequest {
            q: sentence,
            source: source_lang,
            target: target_lang,
            format: "text",
            api_key: self.api_key.as_deref(),
        };
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TranslationError::Timeout(self.timeout)
            } else {
                TranslationError::Transport(e.to_string())
            }
        };
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_err)?;
        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(TranslationError::RateLimited);
        }
        let text = resp.text().await.map_err(map_err)?;
        if !status.is_success() {
            return Err(TranslationError::Status {
                status: status.as_u16(),
                body: truncate_chars(text.trim(), 240),
            });
        }
        let parsed: LibreResponse = serde_json::from_str(&text)
            .map_err(|e| TranslationError::Transport(format!("decode response: {e}")))?;
        Ok(parsed.translated_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl Translator for Fixed {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            Ok(self.0.to_string())
        }
    }

    struct Slow;

    #[async_trait]
    impl Translator for Slow {
        async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslationError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn blank_translation_is_empty_response() {
        let err = translate_sentence(&Fixed("  "), "你好", "zh", "en", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, TranslationError::EmptyResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_translator_times_out() {
        let timeout = Duration::from_millis(50);
        let err = translate_sentence(&Slow, "你好", "zh", "en", timeout)
            .await
            .unwrap_err();
        assert_eq!(err, TranslationError::Timeout(timeout));
    }

    #[tokio::test]
    async fn chat_translator_sends_languages_and_sentence() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::Regex("Translate from zh to en".into()),
                mockito::Matcher::Regex("我爱看书".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"I love reading"}}]}"#)
            .create_async()
            .await;

        let client = ChatClient::new(crate::models::ChatModelConfig {
            name: "translator".into(),
            base_url: server.url(),
            model: "m".into(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 128,
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        let prompts = crate::pipeline::PromptSet::default();
        let t = ChatTranslator::new(
            Arc::new(client),
            prompts.translate_system,
            prompts.translate_user,
        );

        let out = translate_sentence(&t, "我爱看书", "zh", "en", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "I love reading");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn libretranslate_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/translate")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "q": "我爱看书", "source": "zh", "target": "en"
            })))
            .with_status(200)
            .with_body(r#"{"translatedText":"I love reading"}"#)
            .create_async()
            .await;

        let t = LibreTranslator::new(server.url(), None, Duration::from_secs(5)).unwrap();
        let out = t.translate("我爱看书", "zh", "en").await.unwrap();
        assert_eq!(out, "I love reading");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn libretranslate_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/translate")
            .with_status(429)
            .create_async()
            .await;
        let t = LibreTranslator::new(server.url(), None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.translate("你好", "zh", "en").await.unwrap_err(),
            TranslationError::RateLimited
        );
    }

    #[test]
    fn provider_selector() {
        assert_eq!(TranslatorProvider::parse(None).unwrap(), TranslatorProvider::Llm);
        assert_eq!(
            TranslatorProvider::parse(Some("LibreTranslate")).unwrap(),
            TranslatorProvider::LibreTranslate
        );
        assert_eq!(
            TranslatorProvider::parse(Some("off")).unwrap(),
            TranslatorProvider::Disabled
        );
        assert!(TranslatorProvider::parse(Some("google")).is_err());
    }
}
