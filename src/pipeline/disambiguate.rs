//! Context-driven sense selection for ambiguous tokens.
//!
//! Every token whose primary sense lists more than one definition gets one model call; tokens
//! with a single definition never reach the model. Calls fan out concurrently, bounded by a
//! process-wide semaphore so parallel requests share the same budget against the model service.
//! Each call has its own timeout, and an optional per-request deadline caps the whole fan-out,
//! waits for a permit included. A failed call leaves `predicted_definition` empty and records
//! the error on the entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::error::DisambiguationError;
use crate::ir::TokenEntry;
use crate::models::ChatClient;
use crate::textutil::{clean_model_reply, extract_json_obj, truncate_chars};

use super::prompts::render_template;

#[async_trait]
pub trait SenseModel: Send + Sync {
    /// Free-text reply naming the definition that fits `token` in `context_sentence`.
    async fn pick_sense(
        &self,
        token: &str,
        joined_definitions: &str,
        context_sentence: &str,
    ) -> Result<String, DisambiguationError>;
}

pub struct ChatSenseModel {
    client: Arc<ChatClient>,
    system_prompt: String,
    user_template: String,
}

impl ChatSenseModel {
    pub fn new(client: Arc<ChatClient>, system_prompt: String, user_template: String) -> Self {
        Self {
            client,
            system_prompt,
            user_template,
        }
    }
}

#[async_trait]
impl SenseModel for ChatSenseModel {
    async fn pick_sense(
        &self,
        token: &str,
        joined_definitions: &str,
        context_sentence: &str,
    ) -> Result<String, DisambiguationError> {
        let user = render_template(
            &self.user_template,
            &[
                ("sentence", context_sentence),
                ("token", token),
                ("definitions", joined_definitions),
            ],
        );
        Ok(self.client.chat(Some(&self.system_prompt), &user).await?)
    }
}

pub struct Disambiguator {
    model: Arc<dyn SenseModel>,
    limit: Arc<Semaphore>,
    timeout: Duration,
    request_deadline: Option<Duration>,
    strict: bool,
}

impl Disambiguator {
    pub fn new(
        model: Arc<dyn SenseModel>,
        max_concurrent: usize,
        timeout: Duration,
        strict: bool,
    ) -> Self {
        Self {
            model,
            limit: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
            request_deadline: None,
            strict,
        }
    }

    #[must_use]
    pub fn with_request_deadline(mut self, deadline: Duration) -> Self {
        self.request_deadline = Some(deadline);
        self
    }

    /// Attach a predicted definition to every ambiguous entry. `tokens[i]` is the surface form of
    /// `entries[i]`. Returns the number of model calls issued.
    pub async fn disambiguate_entries(
        &self,
        tokens: &[String],
        entries: &mut [TokenEntry],
        sentence: &str,
    ) -> usize {
        let deadline = self
            .request_deadline
            .map(|d| (d, tokio::time::Instant::now() + d));
        let results = join_all(
            tokens
                .iter()
                .zip(entries.iter())
                .enumerate()
                .filter(|(_, (_, entry))| entry.is_ambiguous())
                .map(|(i, (token, entry))| async move {
                    let call = self.disambiguate(token, entry, sentence);
                    let result = match deadline {
                        Some((budget, at)) => tokio::time::timeout_at(at, call)
                            .await
                            .unwrap_or(Err(DisambiguationError::DeadlineExceeded(budget))),
                        None => call.await,
                    };
                    (i, result)
                }),
        )
        .await;

        let calls = results.len();
        for (i, result) in results {
            match result {
                Ok(definition) => entries[i].predicted_definition = Some(definition),
                Err(err) => {
                    log::warn!("disambiguation failed for '{}': {err}", tokens[i]);
                    entries[i].disambiguation_error = Some(err.to_string());
                }
            }
        }
        calls
    }

    pub async fn disambiguate(
        &self,
        token: &str,
        entry: &TokenEntry,
        sentence: &str,
    ) -> Result<String, DisambiguationError> {
        let _permit = self
            .limit
            .acquire()
            .await
            .map_err(|_| DisambiguationError::Transport("model limiter closed".to_string()))?;
        let joined = entry.joined_definitions();
        let reply = tokio::time::timeout(
            self.timeout,
            self.model.pick_sense(token, &joined, sentence),
        )
        .await
        .map_err(|_| DisambiguationError::Timeout(self.timeout))??;
        let chosen = interpret_reply(&reply, &entry.definitions, self.strict)?;
        log::debug!("'{token}' -> {chosen}");
        Ok(chosen)
    }
}

/// Map a model reply onto the candidate list.
///
/// An exact (case-insensitive) match returns the candidate verbatim, then the longest candidate
/// quoted inside the reply. Otherwise the cleaned reply itself is the best-effort answer, or an
/// error when `strict` is set.
pub fn interpret_reply(
    reply: &str,
    candidates: &[String],
    strict: bool,
) -> Result<String, DisambiguationError> {
    let named = extract_json_obj(reply)
        .ok()
        .and_then(|v| v.get("definition").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| reply.to_string());
    let cleaned = clean_model_reply(&named);
    if cleaned.is_empty() {
        return Err(DisambiguationError::Malformed("empty reply".to_string()));
    }

    let cleaned_lower = cleaned.to_lowercase();
    if let Some(c) = candidates
        .iter()
        .find(|c| c.trim().to_lowercase() == cleaned_lower)
    {
        return Ok(c.clone());
    }

    let named_lower = named.to_lowercase();
    if let Some(c) = candidates
        .iter()
        .filter(|c| contains_phrase(&named_lower, &c.trim().to_lowercase()))
        .max_by_key(|c| c.chars().count())
    {
        return Ok(c.clone());
    }

    if strict {
        return Err(DisambiguationError::Malformed(format!(
            "reply names no candidate: {}",
            truncate_chars(&cleaned, 80)
        )));
    }
    Ok(cleaned)
}

/// `needle` occurs in `haystack` without being glued to neighbouring letters or digits.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(at, _)| {
        let before = haystack[..at].chars().next_back();
        let after = haystack[at + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
