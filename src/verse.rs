use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One addressable verse: book, 1-based chapter and verse numbers, and the
/// verse's word tokens joined with single spaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verse {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
}

impl Verse {
    pub fn reference(&self) -> VerseRef {
        VerseRef {
            book: self.book.clone(),
            chapter: self.chapter,
            verse: self.verse,
        }
    }

    pub fn is_at(&self, reference: &VerseRef) -> bool {
        self.book == reference.book
            && self.chapter == reference.chapter
            && self.verse == reference.verse
    }

    /// Word tokens as the reading view splits them: on single spaces, so an
    /// empty source token still occupies a position.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split(' ')
    }

    pub fn word(&self, index: usize) -> Option<&str> {
        self.words().nth(index)
    }
}

/// `Book C:V` address of a verse. Book names may contain spaces
/// (`1 Samuel 3:4`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRef {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
}

impl VerseRef {
    pub fn new(book: impl Into<String>, chapter: u32, verse: u32) -> Self {
        Self {
            book: book.into(),
            chapter,
            verse,
        }
    }

    pub fn find<'v>(&self, verses: &'v [Verse]) -> Option<(usize, &'v Verse)> {
        verses
            .iter()
            .enumerate()
            .find(|(_, verse)| verse.is_at(self))
    }
}

impl fmt::Display for VerseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book, self.chapter, self.verse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRefError(String);

impl fmt::Display for ParseRefError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid verse reference {:?}: expected `Book C:V`", self.0)
    }
}

impl std::error::Error for ParseRefError {}

impl FromStr for VerseRef {
    type Err = ParseRefError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ParseRefError(input.to_string());
        let (book, location) = input.trim().rsplit_once(' ').ok_or_else(err)?;
        let (chapter, verse) = location.split_once(':').ok_or_else(err)?;
        let book = book.trim();
        if book.is_empty() {
            return Err(err());
        }
        let chapter: u32 = chapter.parse().map_err(|_| err())?;
        let verse: u32 = verse.parse().map_err(|_| err())?;
        if chapter == 0 || verse == 0 {
            return Err(err());
        }
        Ok(VerseRef::new(book, chapter, verse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_word_book_names() {
        let reference: VerseRef = "1 Samuel 3:4".parse().unwrap();
        assert_eq!(reference, VerseRef::new("1 Samuel", 3, 4));
        assert_eq!(reference.to_string(), "1 Samuel 3:4");
    }

    #[test]
    fn rejects_malformed_references() {
        for input in ["Genesis", "Genesis 1", "Genesis 0:1", "Genesis 1:x", " 1:1"] {
            assert!(input.parse::<VerseRef>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn words_keep_empty_positions() {
        let verse = Verse {
            book: "Job".into(),
            chapter: 1,
            verse: 1,
            text: "a  b".into(),
        };
        assert_eq!(verse.words().collect::<Vec<_>>(), vec!["a", "", "b"]);
        assert_eq!(verse.word(2), Some("b"));
        assert_eq!(verse.word(3), None);
    }
}
