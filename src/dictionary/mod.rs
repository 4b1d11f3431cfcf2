pub mod cedict;
pub mod segmenter;

use serde::Serialize;

pub use cedict::{CedictDictionary, DictEntry};
pub use segmenter::{recursive_split, CedictSegmenter};

/// Body of a `/definitionLookup` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionLookup {
    pub dictionary_data: Vec<DictEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<String>>,
}

/// Entries for `token`; an unknown token is split into known pieces whose entries are
/// concatenated in order.
#[must_use]
pub fn lookup_definitions(dict: &CedictDictionary, token: &str) -> DefinitionLookup {
    let direct = dict.lookup(token);
    if !direct.is_empty() {
        return DefinitionLookup {
            dictionary_data: direct.into_iter().cloned().collect(),
            segments: None,
        };
    }
    let segments = recursive_split(dict, token);
    let dictionary_data = segments
        .iter()
        .flat_map(|s| dict.lookup(s))
        .cloned()
        .collect();
    DefinitionLookup {
        dictionary_data,
        segments: Some(segments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cedict::SAMPLE_CEDICT;

    #[test]
    fn known_token_returns_entries_without_segments() {
        let dict = CedictDictionary::parse_str(SAMPLE_CEDICT);
        let out = lookup_definitions(&dict, "看");
        assert_eq!(out.dictionary_data.len(), 2);
        assert!(out.segments.is_none());

        let v = serde_json::to_value(&out).unwrap();
        assert!(v.get("segments").is_none());
        assert_eq!(v["dictionaryData"][0]["pinyin"], "kan4");
    }

    #[test]
    fn unknown_token_falls_back_to_segments() {
        let dict = CedictDictionary::parse_str(SAMPLE_CEDICT);
        let out = lookup_definitions(&dict, "我看书");
        assert_eq!(
            out.segments,
            Some(vec!["我".to_string(), "看书".to_string()])
        );
        let heads: Vec<&str> = out
            .dictionary_data
            .iter()
            .map(|e| e.simplified.as_str())
            .collect();
        assert_eq!(heads, vec!["我", "看书"]);
    }
}
