use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptKind {
    Simplified,
    Traditional,
}

/// One dictionary sense of a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sense {
    pub definitions: Vec<String>,
    pub kind: ScriptKind,
    /// Dictionary headword; may differ from the surface form (e.g. 爱 -> 愛).
    #[serde(rename = "match")]
    pub canonical_form: String,
    pub pinyin: Vec<String>,
}

/// A segmented token with its candidate senses (never empty).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRecord {
    surface_form: String,
    primary: Sense,
    others: Vec<Sense>,
}

impl TokenRecord {
    /// `None` when `candidate_senses` is empty.
    pub fn new(surface_form: String, candidate_senses: Vec<Sense>) -> Option<Self> {
        let mut senses = candidate_senses.into_iter();
        let primary = senses.next()?;
        Some(Self {
            surface_form,
            primary,
            others: senses.collect(),
        })
    }

    pub fn surface_form(&self) -> &str {
        &self.surface_form
    }

    /// First-listed sense.
    pub fn primary_sense(&self) -> &Sense {
        &self.primary
    }

    pub fn candidate_senses(&self) -> impl Iterator<Item = &Sense> {
        std::iter::once(&self.primary).chain(self.others.iter())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenEntry {
    pub definitions: Vec<String>,
    pub kind: ScriptKind,
    #[serde(rename = "match")]
    pub canonical_form: String,
    pub pinyin: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disambiguation_error: Option<String>,
}

impl TokenEntry {
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.definitions.len() > 1
    }

    #[must_use]
    pub fn joined_definitions(&self) -> String {
        self.definitions.join(DEFINITION_DELIMITER)
    }
}

pub const DEFINITION_DELIMITER: &str = " / ";

/// A token entry tagged with its surface form, one per segmenter token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOccurrence {
    pub token: String,
    #[serde(flatten)]
    pub entry: TokenEntry,
}

/// The terminal artifact of one `/parse` request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnrichedResult {
    /// Keyed by surface form; a key keeps the position of its first occurrence and holds the
    /// entry of its last occurrence.
    #[serde(rename = "parsed")]
    pub token_map: IndexMap<String, TokenEntry>,
    #[serde(rename = "translation")]
    pub sentence_translation: Option<String>,
    #[serde(rename = "tokens")]
    pub token_order: Vec<String>,
    #[serde(rename = "entries")]
    pub occurrences: Vec<TokenOccurrence>,
    #[serde(rename = "raw")]
    pub raw_segmenter_output: serde_json::Value,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
