//! Phonetic and morphological annotations for clicked words.
//!
//! The lexicon is compiled by `build.rs` into an FST keyed by cleaned word
//! form and a zstd-compressed rkyv archive of entries, both embedded in the
//! binary and decoded on first use.

use crate::data::{ArchivedEntryRecord, ArchivedLexiconStore, ArchivedPackedStrings, ArchivedStringId};
use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, Streamer};
use once_cell::sync::Lazy;
use rkyv::access_unchecked;
use rkyv::util::AlignedVec;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::Cursor;
use std::str;
use zstd::stream::decode_all;

static LEXICON_FST_BYTES: &[u8] = include_bytes!(env!("LEXICON_FST"));
static LEXICON_BYTES: &[u8] = include_bytes!(env!("TANAKH_LEXICON"));

static LEXICON_MAP: Lazy<Map<&'static [u8]>> =
    Lazy::new(|| Map::new(LEXICON_FST_BYTES).expect("valid lexicon fst"));
static DATA_SLICE: Lazy<&'static AlignedVec> = Lazy::new(|| {
    let decompressed = decode_all(Cursor::new(LEXICON_BYTES)).expect("decompress lexicon data");
    let mut aligned = AlignedVec::with_capacity(decompressed.len());
    aligned.extend_from_slice(&decompressed);
    Box::leak(Box::new(aligned))
});
static DATA_STORE: Lazy<&'static ArchivedLexiconStore> =
    Lazy::new(|| unsafe { access_unchecked::<ArchivedLexiconStore>(DATA_SLICE.as_slice()) });

const DIVINE_NAME: &str = "יְהוָה";
const DIVINE_NAME_READING: &str = "אֲדֹנָי";

/// Letters, vowel points, shin/sin dots and qamats qatan. Cantillation,
/// maqaf, sof pasuq and everything else is dropped.
fn is_kept_mark(ch: char) -> bool {
    matches!(
        ch,
        '\u{05D0}'..='\u{05EA}' | '\u{05B0}'..='\u{05BC}' | '\u{05C1}'..='\u{05C2}' | '\u{05C7}'
    )
}

/// Reduces a corpus token to the form lexicon entries are keyed by.
pub fn clean_token(token: &str) -> String {
    token.chars().filter(|&ch| is_kept_mark(ch)).collect()
}

/// Cleaned form as it is read aloud: the divine name is read as Adonai.
pub fn reading_form(cleaned: &str) -> &str {
    if cleaned == DIVINE_NAME {
        DIVINE_NAME_READING
    } else {
        cleaned
    }
}

/// Lexicon key for a clicked token, or `None` when nothing lexical is left.
pub fn lexicon_key(token: &str) -> Option<String> {
    let cleaned = clean_token(token);
    if cleaned.is_empty() {
        return None;
    }
    Some(reading_form(&cleaned).to_string())
}

/// Sorted distinct cleaned words, the input list for lexicon generation.
pub fn unique_words<'a>(tokens: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    tokens
        .into_iter()
        .map(clean_token)
        .filter(|word| !word.is_empty())
        .collect()
}

/// Read-only access to the embedded lexicon.
pub struct LexiconIndex;

impl LexiconIndex {
    /// Returns the entry ID for an exact cleaned word.
    pub fn get(word: &str) -> Option<u32> {
        LEXICON_MAP.get(word).map(|value| value as u32)
    }

    pub fn len() -> usize {
        LEXICON_MAP.len()
    }

    /// Returns up to `limit` words that start with the provided prefix.
    pub fn prefix(prefix: &str, limit: usize) -> Vec<(String, u32)> {
        let automaton = Str::new(prefix).starts_with();
        let mut stream = LEXICON_MAP.search(automaton).into_stream();
        let mut results = Vec::new();
        while let Some((key, value)) = stream.next() {
            if results.len() >= limit {
                break;
            }
            let word = String::from_utf8_lossy(key).into_owned();
            results.push((word, value as u32));
        }
        results
    }

    pub fn entry_by_id(entry_id: u32) -> Option<LexiconEntry<'static>> {
        data_store()
            .entries
            .get(entry_id as usize)
            .map(|entry| LexiconEntry {
                store: data_store(),
                entry,
            })
    }

    pub fn entry_by_word(word: &str) -> Option<LexiconEntry<'static>> {
        Self::get(word).and_then(Self::entry_by_id)
    }

    /// Cleans a raw corpus token and resolves it.
    pub fn lookup_token(token: &str) -> Lookup {
        let key = lexicon_key(token);
        let entry = key
            .as_deref()
            .and_then(Self::entry_by_word)
            .map(|entry| entry.to_annotation());
        Lookup {
            token: token.to_string(),
            key,
            entry,
        }
    }
}

fn data_store() -> &'static ArchivedLexiconStore {
    *DATA_STORE
}

pub struct LexiconEntry<'a> {
    store: &'a ArchivedLexiconStore,
    entry: &'a ArchivedEntryRecord,
}

impl<'a> LexiconEntry<'a> {
    pub fn entry_id(&self) -> u32 {
        self.entry.entry_id.to_native()
    }

    pub fn word(&self) -> &'a str {
        self.store.strings.get(self.entry.word)
    }

    pub fn ipa(&self) -> &'a str {
        self.store.strings.get(self.entry.ipa)
    }

    pub fn morph(&self) -> Option<&'a str> {
        self.entry
            .morph
            .as_ref()
            .map(|id| self.store.strings.get(*id))
    }

    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            entry_id: self.entry_id(),
            word: self.word().to_string(),
            ipa: self.ipa().to_string(),
            morph: self.morph().map(str::to_string),
        }
    }
}

/// Owned copy of a lexicon entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub entry_id: u32,
    pub word: String,
    pub ipa: String,
    pub morph: Option<String>,
}

/// Result of resolving a clicked token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lookup {
    pub token: String,
    pub key: Option<String>,
    pub entry: Option<Annotation>,
}

impl Lookup {
    pub fn found(&self) -> bool {
        self.entry.is_some()
    }
}

impl ArchivedPackedStrings {
    fn get(&self, id: ArchivedStringId) -> &str {
        let idx = id.to_native() as usize;
        let start = self.offsets.as_slice()[idx].to_native() as usize;
        let len = self.lengths.as_slice()[idx].to_native() as usize;
        let data = self.data.as_slice();
        let bytes = &data[start..start + len];
        str::from_utf8(bytes).expect("stored string data is valid UTF-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_drops_cantillation_and_punctuation() {
        assert_eq!(clean_token("הָאָֽרֶץ׃"), "הָאָרֶץ");
        assert_eq!(clean_token("עַל־פְּנֵי"), "עַלפְּנֵי");
        assert_eq!(clean_token("׃"), "");
        assert_eq!(clean_token("פ"), "פ");
    }

    #[test]
    fn divine_name_is_keyed_by_its_reading() {
        assert_eq!(lexicon_key("יְהוָה").as_deref(), Some("אֲדֹנָי"));
        assert_eq!(lexicon_key("׃"), None);
    }

    #[test]
    fn unique_words_are_sorted_and_deduplicated() {
        let words = unique_words(["אוֹר׃", "אוֹר", "׃", "יוֹם"]);
        assert_eq!(
            words.into_iter().collect::<Vec<_>>(),
            vec!["אוֹר".to_string(), "יוֹם".to_string()]
        );
    }

    #[test]
    fn bundled_lexicon_resolves_words() {
        let entry = LexiconIndex::entry_by_word("אֱלֹהִים").expect("bundled entry");
        assert_eq!(entry.word(), "אֱלֹהִים");
        assert_eq!(entry.ipa(), "ʔeloˈhim");
        assert_eq!(entry.morph(), Some("noun m.pl."));
        assert_eq!(LexiconIndex::get("nonexistent"), None);
        assert!(LexiconIndex::len() > 0);
    }

    #[test]
    fn lookup_token_cleans_before_resolving() {
        let lookup = LexiconIndex::lookup_token("הָאָרֶץ׃");
        assert!(lookup.found());
        assert_eq!(lookup.key.as_deref(), Some("הָאָרֶץ"));

        let divine = LexiconIndex::lookup_token("יְהוָה");
        assert_eq!(divine.entry.map(|entry| entry.word), Some("אֲדֹנָי".to_string()));

        let marker = LexiconIndex::lookup_token("׃");
        assert!(!marker.found());
        assert_eq!(marker.key, None);
    }

    #[test]
    fn prefix_respects_limit() {
        let matches = LexiconIndex::prefix("הָ", 1);
        assert_eq!(matches.len(), 1);
        assert!(matches[0].0.starts_with("הָ"));
    }
}
