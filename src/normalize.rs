//! Flattening of a book → chapter → verse → word corpus into verse records.

use crate::corpus::{Anomaly, Corpus, InvalidReason, Slot, Validation, ordinal};
use crate::error::LoadError;
use crate::verse::Verse;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, warn};

/// Malformed entries left out of the flattened output, per level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub books: usize,
    pub chapters: usize,
    pub verses: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.books + self.chapters + self.verses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub verses: Vec<Verse>,
    pub skipped: SkipCounts,
    pub anomalies: Vec<Anomaly>,
}

/// Validates and flattens a corpus document.
///
/// `None` and JSON `null` are [`LoadError::MissingCorpus`]; a document that
/// validates but contains no usable verse is [`LoadError::EmptyResult`].
pub fn normalize(document: Option<&Value>) -> Result<Normalized, LoadError> {
    match Corpus::validate(document) {
        Validation::Valid(corpus) => flatten(&corpus),
        Validation::Invalid(InvalidReason::Missing) => {
            error!("corpus document is absent");
            Err(LoadError::MissingCorpus)
        }
        Validation::Invalid(reason) => {
            error!(%reason, "corpus document rejected");
            Err(LoadError::InvalidCorpus(reason))
        }
    }
}

pub fn flatten(corpus: &Corpus<'_>) -> Result<Normalized, LoadError> {
    let mut verses = Vec::new();
    let mut skipped = SkipCounts::default();

    for book in corpus.books() {
        let Slot::Present(chapters) = &book.chapters else {
            warn!(book = book.name, "skipping book that is not a sequence of chapters");
            skipped.books += 1;
            continue;
        };
        debug!(book = book.name, chapters = chapters.len(), "flattening book");

        for (chapter_idx, chapter) in chapters.iter().enumerate() {
            let chapter_no = ordinal(chapter_idx);
            let Slot::Present(chapter) = chapter else {
                warn!(book = book.name, chapter = chapter_no, "skipping chapter that is not a sequence of verses");
                skipped.chapters += 1;
                continue;
            };

            for (verse_idx, words) in chapter.iter().enumerate() {
                let verse_no = ordinal(verse_idx);
                let Slot::Present(words) = words else {
                    warn!(
                        book = book.name,
                        chapter = chapter_no,
                        verse = verse_no,
                        "skipping verse that is not a sequence of words"
                    );
                    skipped.verses += 1;
                    continue;
                };
                verses.push(Verse {
                    book: book.name.to_string(),
                    chapter: chapter_no,
                    verse: verse_no,
                    text: words.join(" "),
                });
            }
        }
    }

    if skipped.books > 0 {
        warn!(skipped = skipped.books, "skipped books due to structure issues");
    }
    if skipped.chapters + skipped.verses > 0 {
        warn!(
            chapters = skipped.chapters,
            verses = skipped.verses,
            "skipped chapters and verses due to structure issues"
        );
    }
    if verses.is_empty() {
        error!(skipped = skipped.total(), "corpus produced no verses");
        return Err(LoadError::EmptyResult { skipped });
    }
    debug!(verses = verses.len(), "corpus flattened");

    Ok(Normalized {
        verses,
        skipped,
        anomalies: corpus.anomalies().to_vec(),
    })
}
