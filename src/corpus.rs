//! Shape validation for untrusted corpus documents.
//!
//! A corpus document maps book names to chapters, chapters to verses and
//! verses to word tokens. [`Corpus::validate`] is the single place where the
//! accepted shape is decided: the result is either a typed, borrowed view of
//! the document or the reason the whole document is unusable. Malformed
//! books, chapters and verses keep their slot (so numbering of later
//! siblings is unaffected) and are recorded as [`Anomaly`] values.

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// JSON type of a value, used when reporting shape problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

impl fmt::Display for JsonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JsonKind::Null => "null",
            JsonKind::Bool => "boolean",
            JsonKind::Number => "number",
            JsonKind::String => "string",
            JsonKind::Array => "array",
            JsonKind::Object => "object",
        };
        f.write_str(label)
    }
}

/// Why a corpus document cannot be used at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No document, or a JSON `null`.
    Missing,
    /// The top level is present but is not a book mapping.
    NotAMapping { found: JsonKind },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::Missing => write!(f, "corpus document is absent"),
            InvalidReason::NotAMapping { found } => {
                write!(f, "expected a mapping of book names, found {found}")
            }
        }
    }
}

pub enum Validation<'a> {
    Valid(Corpus<'a>),
    Invalid(InvalidReason),
}

/// A position in the corpus that either holds well-formed data or was
/// rejected by validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot<T> {
    Present(T),
    Malformed,
}

impl<T> Slot<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Slot::Present(value) => Some(value),
            Slot::Malformed => None,
        }
    }
}

pub type Tokens<'a> = Vec<Cow<'a, str>>;
pub type Chapter<'a> = Vec<Slot<Tokens<'a>>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Book<'a> {
    pub name: &'a str,
    pub chapters: Slot<Vec<Slot<Chapter<'a>>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLevel {
    Book,
    Chapter,
    Verse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnomalyKind {
    /// The slot should hold a sequence but holds something else.
    NotASequence { found: JsonKind },
    /// A verse contains a token that cannot be rendered as a word.
    NestedToken { found: JsonKind },
}

/// A malformed slot, addressed by 1-based chapter and verse numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub level: AnomalyLevel,
    pub book: String,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
    #[serde(flatten)]
    pub kind: AnomalyKind,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.book)?;
        if let Some(chapter) = self.chapter {
            write!(f, " {chapter}")?;
        }
        if let Some(verse) = self.verse {
            write!(f, ":{verse}")?;
        }
        match self.kind {
            AnomalyKind::NotASequence { found } => {
                write!(f, ": {:?} is a {found}, not a sequence", self.level)
            }
            AnomalyKind::NestedToken { found } => {
                write!(f, ": verse contains a nested {found} token")
            }
        }
    }
}

/// Borrowed, shape-checked view of a corpus document.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus<'a> {
    books: Vec<Book<'a>>,
    anomalies: Vec<Anomaly>,
}

impl<'a> Corpus<'a> {
    pub fn validate(document: Option<&'a Value>) -> Validation<'a> {
        let books = match document {
            None | Some(Value::Null) => return Validation::Invalid(InvalidReason::Missing),
            Some(Value::Object(books)) => books,
            Some(other) => {
                return Validation::Invalid(InvalidReason::NotAMapping {
                    found: JsonKind::of(other),
                });
            }
        };

        let mut anomalies = Vec::new();
        let books = books
            .iter()
            .map(|(name, chapters)| Book {
                name: name.as_str(),
                chapters: validate_book(name, chapters, &mut anomalies),
            })
            .collect();
        Validation::Valid(Corpus { books, anomalies })
    }

    pub fn books(&self) -> &[Book<'a>] {
        &self.books
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Every word token of every well-formed verse, in document order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.books
            .iter()
            .filter_map(|book| book.chapters.present())
            .flatten()
            .filter_map(Slot::present)
            .flatten()
            .filter_map(Slot::present)
            .flatten()
            .map(|token| &**token)
    }
}

fn validate_book<'a>(
    name: &str,
    chapters: &'a Value,
    anomalies: &mut Vec<Anomaly>,
) -> Slot<Vec<Slot<Chapter<'a>>>> {
    let Value::Array(chapters) = chapters else {
        anomalies.push(Anomaly {
            level: AnomalyLevel::Book,
            book: name.to_string(),
            chapter: None,
            verse: None,
            kind: AnomalyKind::NotASequence {
                found: JsonKind::of(chapters),
            },
        });
        return Slot::Malformed;
    };

    let chapters = chapters
        .iter()
        .enumerate()
        .map(|(chapter_idx, verses)| {
            let chapter_no = ordinal(chapter_idx);
            let Value::Array(verses) = verses else {
                anomalies.push(Anomaly {
                    level: AnomalyLevel::Chapter,
                    book: name.to_string(),
                    chapter: Some(chapter_no),
                    verse: None,
                    kind: AnomalyKind::NotASequence {
                        found: JsonKind::of(verses),
                    },
                });
                return Slot::Malformed;
            };
            let verses = verses
                .iter()
                .enumerate()
                .map(|(verse_idx, words)| match validate_verse(words) {
                    Ok(tokens) => Slot::Present(tokens),
                    Err(kind) => {
                        anomalies.push(Anomaly {
                            level: AnomalyLevel::Verse,
                            book: name.to_string(),
                            chapter: Some(chapter_no),
                            verse: Some(ordinal(verse_idx)),
                            kind,
                        });
                        Slot::Malformed
                    }
                })
                .collect();
            Slot::Present(verses)
        })
        .collect();
    Slot::Present(chapters)
}

fn validate_verse(words: &Value) -> Result<Tokens<'_>, AnomalyKind> {
    let Value::Array(words) = words else {
        return Err(AnomalyKind::NotASequence {
            found: JsonKind::of(words),
        });
    };
    words.iter().map(token).collect()
}

fn token(word: &Value) -> Result<Cow<'_, str>, AnomalyKind> {
    match word {
        Value::String(text) => Ok(Cow::Borrowed(text.as_str())),
        Value::Null => Ok(Cow::Borrowed("")),
        Value::Bool(flag) => Ok(Cow::Owned(flag.to_string())),
        Value::Number(number) => Ok(Cow::Owned(number.to_string())),
        Value::Array(_) | Value::Object(_) => Err(AnomalyKind::NestedToken {
            found: JsonKind::of(word),
        }),
    }
}

/// 1-based position of the item at `index`.
pub(crate) fn ordinal(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}
