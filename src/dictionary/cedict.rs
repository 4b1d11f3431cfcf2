use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static CEDICT_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s+(\S+)\s+\[([^\]]*)\]\s+/(.*)/\s*$").expect("cedict line regex")
});

/// One CC-CEDICT line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictEntry {
    pub traditional: String,
    pub simplified: String,
    /// Space separated numbered pinyin, e.g. `kan4 shu1`.
    pub pinyin: String,
    pub definitions: Vec<String>,
}

/// In-memory CC-CEDICT, indexed by both headword scripts.
#[derive(Debug, Default)]
pub struct CedictDictionary {
    entries: Vec<DictEntry>,
    index: HashMap<String, Vec<usize>>,
    max_word_chars: usize,
    skipped_lines: usize,
}

impl CedictDictionary {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read dictionary: {}", path.display()))?;
        let dict = Self::parse_str(&text);
        if dict.is_empty() {
            anyhow::bail!("dictionary has no entries: {}", path.display());
        }
        if dict.skipped_lines > 0 {
            log::warn!(
                "dictionary {}: skipped {} malformed lines",
                path.display(),
                dict.skipped_lines
            );
        }
        log::info!(
            "Loaded {} dictionary entries from {}",
            dict.len(),
            path.display()
        );
        Ok(dict)
    }

    /// Lenient parse: comments and blank lines are ignored, malformed lines are counted.
    #[must_use]
    pub fn parse_str(text: &str) -> Self {
        let mut dict = Self::default();
        for line in text.lines() {
            let line = line.trim_start_matches('\u{feff}').trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some(entry) => dict.insert(entry),
                None => dict.skipped_lines += 1,
            }
        }
        dict
    }

    fn insert(&mut self, entry: DictEntry) {
        let idx = self.entries.len();
        let width = entry
            .traditional
            .chars()
            .count()
            .max(entry.simplified.chars().count());
        self.max_word_chars = self.max_word_chars.max(width);

        self.index
            .entry(entry.simplified.clone())
            .or_default()
            .push(idx);
        if entry.traditional != entry.simplified {
            self.index
                .entry(entry.traditional.clone())
                .or_default()
                .push(idx);
        }
        self.entries.push(entry);
    }

    /// All entries whose traditional or simplified headword equals `word`, in file order.
    #[must_use]
    pub fn lookup(&self, word: &str) -> Vec<&DictEntry> {
        self.index
            .get(word)
            .map(|ids| ids.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    #[must_use]
    pub fn max_word_chars(&self) -> usize {
        self.max_word_chars
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

fn parse_line(line: &str) -> Option<DictEntry> {
    let caps = CEDICT_LINE_RE.captures(line)?;
    let definitions: Vec<String> = caps[4]
        .split('/')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();
    Some(DictEntry {
        traditional: caps[1].to_string(),
        simplified: caps[2].to_string(),
        pinyin: caps[3].split_whitespace().collect::<Vec<_>>().join(" "),
        definitions,
    })
}

#[cfg(test)]
pub(crate) const SAMPLE_CEDICT: &str = "\
# CC-CEDICT sample
#! version=1
我 我 [wo3] /I/me/my/
愛 爱 [ai4] /to love/to be fond of/to like/affection/to be inclined (to do sth)/to tend to (happen)/
看 看 [kan4] /to see/to look at/to read/to watch/
看 看 [kan1] /to look after/to take care of/
書 书 [shu1] /book/letter/
看書 看书 [kan4 shu1] /to read/to study/
中國 中国 [Zhong1 guo2] /China/
中國人 中国人 [Zhong1 guo2 ren2] /Chinese person/
人 人 [ren2] /person/people/
卡拉OK 卡拉OK [ka3 la1 O K] /karaoke/
";
