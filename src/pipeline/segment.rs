//! Segmentation adapter: runs the segmenter and decodes its native output into `TokenRecord`s.

use serde::{Deserialize, Serialize};

use crate::dictionary::cedict::DictEntry;
use crate::error::SegmentationError;
use crate::ir::{ScriptKind, Sense, TokenRecord};

/// Native segmenter output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segmentation {
    pub tokens: Vec<SegmentedToken>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentedToken {
    pub text: String,
    pub entries: Vec<DictEntry>,
}

pub trait Segmenter: Send + Sync {
    fn segment(&self, sentence: &str) -> Result<Segmentation, SegmentationError>;
}

/// Output of the adapter: typed records plus the untouched segmenter dump.
#[derive(Clone, Debug)]
pub struct SegmentedSentence {
    pub records: Vec<TokenRecord>,
    pub raw: serde_json::Value,
}

pub fn segment_sentence(
    segmenter: &dyn Segmenter,
    sentence: &str,
) -> Result<SegmentedSentence, SegmentationError> {
    if sentence.trim().is_empty() {
        return Err(SegmentationError::EmptySentence);
    }
    let segmentation = segmenter.segment(sentence)?;
    let raw = serde_json::to_value(&segmentation)
        .map_err(|e| SegmentationError::Segmenter(format!("encode raw output: {e}")))?;

    let records = segmentation
        .tokens
        .iter()
        .map(decode_token)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("segmented into {} tokens", records.len());
    Ok(SegmentedSentence { records, raw })
}

fn decode_token(token: &SegmentedToken) -> Result<TokenRecord, SegmentationError> {
    let candidate_senses: Vec<Sense> = token
        .entries
        .iter()
        .filter(|e| !e.definitions.is_empty())
        .map(|e| decode_sense(&token.text, e))
        .collect();
    TokenRecord::new(token.text.clone(), candidate_senses).ok_or_else(|| {
        SegmentationError::NoSenses {
            token: token.text.clone(),
        }
    })
}

/// The surface script is whichever headword the token matched; the canonical form is the
/// headword in the other script.
fn decode_sense(surface: &str, entry: &DictEntry) -> Sense {
    let (kind, canonical_form) = if surface == entry.simplified {
        (ScriptKind::Simplified, entry.traditional.clone())
    } else {
        (ScriptKind::Traditional, entry.simplified.clone())
    };
    Sense {
        definitions: entry.definitions.clone(),
        kind,
        canonical_form,
        pinyin: entry
            .pinyin
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSegmenter(Segmentation);

    impl Segmenter for FixedSegmenter {
        fn segment(&self, _sentence: &str) -> Result<Segmentation, SegmentationError> {
            Ok(self.0.clone())
        }
    }

    fn entry(trad: &str, simp: &str, pinyin: &str, defs: &[&str]) -> DictEntry {
        DictEntry {
            traditional: trad.into(),
            simplified: simp.into(),
            pinyin: pinyin.into(),
            definitions: defs.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn decodes_script_kind_and_canonical_form() {
        let seg = FixedSegmenter(Segmentation {
            tokens: vec![
                SegmentedToken {
                    text: "爱".into(),
                    entries: vec![entry("愛", "爱", "ai4", &["to love"])],
                },
                SegmentedToken {
                    text: "看書".into(),
                    entries: vec![entry("看書", "看书", "kan4 shu1", &["to read", "to study"])],
                },
            ],
        });
        let out = segment_sentence(&seg, "爱看書").unwrap();
        assert_eq!(out.records.len(), 2);

        let ai = out.records[0].primary_sense();
        assert_eq!(ai.kind, ScriptKind::Simplified);
        assert_eq!(ai.canonical_form, "愛");

        let kanshu = out.records[1].primary_sense();
        assert_eq!(kanshu.kind, ScriptKind::Traditional);
        assert_eq!(kanshu.canonical_form, "看书");
        assert_eq!(kanshu.pinyin, vec!["kan4", "shu1"]);

        assert_eq!(out.raw["tokens"][1]["text"], "看書");
    }

    #[test]
    fn token_without_senses_is_an_error() {
        let seg = FixedSegmenter(Segmentation {
            tokens: vec![SegmentedToken {
                text: "龘".into(),
                entries: vec![entry("龘", "龘", "da2", &[])],
            }],
        });
        let err = segment_sentence(&seg, "龘").unwrap_err();
        assert_eq!(err, SegmentationError::NoSenses { token: "龘".into() });
    }

    #[test]
    fn blank_sentence_is_rejected_before_segmenting() {
        let seg = FixedSegmenter(Segmentation::default());
        assert_eq!(
            segment_sentence(&seg, "  ").unwrap_err(),
            SegmentationError::EmptySentence
        );
    }
}
