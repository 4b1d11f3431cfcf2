use indexmap::IndexMap;

use crate::error::PipelineError;
use crate::ir::{EnrichedResult, TokenEntry, TokenOccurrence};

/// Merge per-token entries into the response.
///
/// Repeated surface forms: the `parsed` key stays at its first position and holds the last
/// occurrence's entry; `tokens` and `entries` keep every occurrence in sentence order.
pub fn assemble(
    entries: Vec<(String, TokenEntry)>,
    translation: Option<String>,
    raw: serde_json::Value,
    warnings: Vec<String>,
) -> Result<EnrichedResult, PipelineError> {
    let mut token_map: IndexMap<String, TokenEntry> = IndexMap::with_capacity(entries.len());
    let mut token_order = Vec::with_capacity(entries.len());
    let mut occurrences = Vec::with_capacity(entries.len());

    for (token, entry) in entries {
        if token.is_empty() {
            return Err(PipelineError::Assembly(
                "segmenter produced an empty token".to_string(),
            ));
        }
        // IndexMap::insert keeps the original slot of an existing key.
        token_map.insert(token.clone(), entry.clone());
        token_order.push(token.clone());
        occurrences.push(TokenOccurrence { token, entry });
    }

    Ok(EnrichedResult {
        token_map,
        sentence_translation: translation,
        token_order,
        occurrences,
        raw_segmenter_output: raw,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ScriptKind;

    fn entry(def: &str, predicted: Option<&str>) -> TokenEntry {
        TokenEntry {
            definitions: vec![def.to_string(), "other".to_string()],
            kind: ScriptKind::Simplified,
            canonical_form: "看".into(),
            pinyin: vec!["kan4".into()],
            predicted_definition: predicted.map(str::to_string),
            disambiguation_error: None,
        }
    }

    #[test]
    fn repeated_token_keeps_first_slot_and_last_value() {
        let out = assemble(
            vec![
                ("看".into(), entry("to see", Some("to see"))),
                ("书".into(), entry("book", None)),
                ("看".into(), entry("to see", Some("to read"))),
            ],
            None,
            serde_json::Value::Null,
            vec![],
        )
        .unwrap();

        assert_eq!(out.token_order, vec!["看", "书", "看"]);
        assert_eq!(out.token_map.len(), 2);
        let keys: Vec<&String> = out.token_map.keys().collect();
        assert_eq!(keys, vec!["看", "书"]);
        assert_eq!(
            out.token_map["看"].predicted_definition.as_deref(),
            Some("to read")
        );
        assert_eq!(
            out.occurrences[0].entry.predicted_definition.as_deref(),
            Some("to see")
        );
    }

    #[test]
    fn serializes_wire_shape() {
        let out = assemble(
            vec![("书".into(), entry("book", None))],
            Some("Book".into()),
            serde_json::json!({"tokens": []}),
            vec!["translation unavailable: x".into()],
        )
        .unwrap();
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["translation"], "Book");
        assert_eq!(v["tokens"], serde_json::json!(["书"]));
        assert_eq!(v["parsed"]["书"]["match"], "看");
        assert_eq!(v["entries"][0]["token"], "书");
        assert_eq!(v["entries"][0]["pinyin"], serde_json::json!(["kan4"]));
        assert_eq!(v["warnings"][0], "translation unavailable: x");
    }

    #[test]
    fn empty_token_is_a_bug_signal() {
        let err = assemble(
            vec![(String::new(), entry("x", None))],
            None,
            serde_json::Value::Null,
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Assembly(_)));
    }
}
