use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::textutil::truncate_chars;

#[derive(Clone, Debug)]
pub struct ChatModelConfig {
    pub name: String,
    /// Base URL of an OpenAI-compatible API, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

/// Client for `POST {base_url}/chat/completions`.
pub struct ChatClient {
    http: reqwest::Client,
    cfg: ChatModelConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Default)]
struct ChatChoice {
    #[serde(default)]
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Default)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    pub fn new(cfg: ChatModelConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .with_context(|| format!("build http client for {}", cfg.name))?;
        Ok(Self { http, cfg })
    }

    pub async fn chat(
        &self,
        system_prompt: Option<&str>,
        user_prompt: &str,
    ) -> Result<String, ChatError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(s) = system_prompt {
            if !s.trim().is_empty() {
                messages.push(ChatMessage {
                    role: "system",
                    content: s,
                });
            }
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_prompt,
        });
        let body = ChatRequest {
            model: &self.cfg.model,
            messages,
            temperature: self.cfg.temperature,
            max_tokens: self.cfg.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'));
        let mut req = self.http.post(&url).json(&body);
        if let Some(key) = self.cfg.api_key.as_deref() {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.map_reqwest(e))?;
        if status.as_u16() == 429 {
            return Err(ChatError::RateLimited);
        }
        if !status.is_success() {
            return Err(ChatError::Status {
                status: status.as_u16(),
                body: truncate_chars(text.trim(), 240),
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::Decode(format!("{e}: {}", truncate_chars(&text, 120))))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::Decode("no choices in response".to_string()))?;
        log::debug!(
            "{}: reply {}",
            self.cfg.name,
            truncate_chars(content.trim(), 120)
        );
        Ok(content.trim().to_string())
    }

    fn map_reqwest(&self, err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout(self.cfg.timeout)
        } else {
            ChatError::Http(err.to_string())
        }
    }
}
