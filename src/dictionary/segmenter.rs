use std::sync::Arc;

use crate::error::SegmentationError;
use crate::pipeline::{Segmentation, SegmentedToken, Segmenter};
use crate::textutil::is_han_char;

use super::cedict::CedictDictionary;

/// Forward maximum-matching segmenter over CC-CEDICT headwords.
pub struct CedictSegmenter {
    dict: Arc<CedictDictionary>,
}

impl CedictSegmenter {
    pub fn new(dict: Arc<CedictDictionary>) -> Self {
        Self { dict }
    }

    /// Longest dictionary word starting at `chars[start]`, as a char count.
    fn longest_match(&self, chars: &[char], start: usize) -> Option<usize> {
        let max = self.dict.max_word_chars().min(chars.len() - start);
        (1..=max).rev().find(|&len| {
            let word: String = chars[start..start + len].iter().collect();
            self.dict.contains(&word)
        })
    }
}

impl Segmenter for CedictSegmenter {
    fn segment(&self, sentence: &str) -> Result<Segmentation, SegmentationError> {
        if sentence.trim().is_empty() {
            return Err(SegmentationError::EmptySentence);
        }
        let chars: Vec<char> = sentence.chars().collect();
        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos < chars.len() {
            let ch = chars[pos];
            if ch.is_whitespace() {
                pos += 1;
                continue;
            }
            match self.longest_match(&chars, pos) {
                Some(len) => {
                    let text: String = chars[pos..pos + len].iter().collect();
                    let entries = self.dict.lookup(&text).into_iter().cloned().collect();
                    tokens.push(SegmentedToken { text, entries });
                    pos += len;
                }
                None => {
                    // Unknown Han characters surface as sense-less tokens; punctuation, digits
                    // and Latin text are not words.
                    if is_han_char(ch) {
                        tokens.push(SegmentedToken {
                            text: ch.to_string(),
                            entries: Vec::new(),
                        });
                    }
                    pos += 1;
                }
            }
        }
        Ok(Segmentation { tokens })
    }
}

/// Split a word the dictionary does not know into known pieces.
///
/// A known word stays whole; otherwise the longest known left prefix is taken and the rest is
/// split recursively; with no known prefix the first character is split off on its own.
#[must_use]
pub fn recursive_split(dict: &CedictDictionary, word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let rest: String = chars[start..].iter().collect();
        if dict.contains(&rest) {
            out.push(rest);
            break;
        }
        let prefix_len = (1..chars.len() - start).rev().find(|&len| {
            let left: String = chars[start..start + len].iter().collect();
            dict.contains(&left)
        });
        let len = prefix_len.unwrap_or(1);
        out.push(chars[start..start + len].iter().collect());
        start += len;
    }
    out
}
