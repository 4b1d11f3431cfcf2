use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static LIST_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s+|\(?\d{1,2}[.)]\s*|[A-Za-z][.)]\s+)").expect("list marker")
});
static ANSWER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:best\s+)?(?:definition|answer|meaning|sense)\s*[:：]\s*")
        .expect("answer prefix")
});
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace"));

const QUOTES: &[char] = &['"', '\'', '`', '“', '”', '‘', '’', '「', '」'];

/// CJK Unified Ideographs plus extension A and the compatibility block.
#[must_use]
pub fn is_han_char(ch: char) -> bool {
    matches!(ch,
        '\u{4e00}'..='\u{9fff}'
        | '\u{3400}'..='\u{4dbf}'
        | '\u{f900}'..='\u{faff}'
        | '\u{20000}'..='\u{2a6df}')
}

/// Reduce a free-text model reply to the phrase it names.
///
/// Only the first non-empty line is considered.
#[must_use]
pub fn clean_model_reply(reply: &str) -> String {
    let line = reply
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");
    let line = ANSWER_PREFIX_RE.replace(line, "");
    let line = LIST_MARKER_RE.replace(&line, "");
    let line = line
        .trim()
        .trim_matches(QUOTES)
        .trim_end_matches(['.', '。', ';', '；', ','])
        .trim()
        .trim_matches(QUOTES)
        .trim();
    WS_RE.replace_all(line, " ").into_owned()
}

/// First JSON object embedded in `text`; trailing prose after the object is ignored.
pub fn extract_json_obj(text: &str) -> anyhow::Result<serde_json::Value> {
    let start = text.find('{').context("no_json_object_start")?;
    let slice = &text[start..];
    let mut de = serde_json::Deserializer::from_str(slice);
    let v: serde_json::Value =
        serde_json::Value::deserialize(&mut de).context("json_parse_failed")?;
    Ok(v)
}

/// Shorten text for log lines.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
