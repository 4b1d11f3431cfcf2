use crate::ir::{TokenEntry, TokenRecord};

/// First-listed sense wins; ranking is left to the disambiguator.
#[must_use]
pub fn reduce(record: &TokenRecord) -> TokenEntry {
    let primary = record.primary_sense();
    TokenEntry {
        definitions: primary.definitions.clone(),
        kind: primary.kind,
        canonical_form: primary.canonical_form.clone(),
        pinyin: primary.pinyin.clone(),
        predicted_definition: None,
        disambiguation_error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ScriptKind, Sense};

    #[test]
    fn picks_first_sense() {
        let record = TokenRecord::new(
            "看".into(),
            vec![
                Sense {
                    definitions: vec!["to see".into(), "to read".into()],
                    kind: ScriptKind::Simplified,
                    canonical_form: "看".into(),
                    pinyin: vec!["kan4".into()],
                },
                Sense {
                    definitions: vec!["to look after".into()],
                    kind: ScriptKind::Simplified,
                    canonical_form: "看".into(),
                    pinyin: vec!["kan1".into()],
                },
            ],
        )
        .unwrap();
        let entry = reduce(&record);
        assert_eq!(entry.pinyin, vec!["kan4"]);
        assert_eq!(entry.definitions, vec!["to see", "to read"]);
        assert!(entry.predicted_definition.is_none());
    }
}
