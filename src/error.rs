use crate::corpus::InvalidReason;
use crate::normalize::SkipCounts;
use serde::Serialize;
use std::fmt;

/// Fatal outcome of loading a corpus.
///
/// Malformed books, chapters and verses are not errors; they are skipped and
/// counted. Only a corpus that is absent, unusable at the top level, or that
/// yields no verse at all ends the load.
#[derive(Debug)]
pub enum LoadError {
    MissingCorpus,
    InvalidCorpus(InvalidReason),
    EmptyResult { skipped: SkipCounts },
    Io(std::io::Error),
    Parse(serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    MissingCorpus,
    InvalidCorpus,
    EmptyResult,
    Io,
    Parse,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        match self {
            LoadError::MissingCorpus => LoadErrorKind::MissingCorpus,
            LoadError::InvalidCorpus(_) => LoadErrorKind::InvalidCorpus,
            LoadError::EmptyResult { .. } => LoadErrorKind::EmptyResult,
            LoadError::Io(_) => LoadErrorKind::Io,
            LoadError::Parse(_) => LoadErrorKind::Parse,
        }
    }

    /// What the reader should do about it, distinct per failure.
    pub fn guidance(&self) -> &'static str {
        match self {
            LoadError::MissingCorpus => {
                "No corpus was bundled or supplied. Place the vocalized text at data/corpus.json \
                 and rebuild, or pass --corpus <path>."
            }
            LoadError::InvalidCorpus(_) => {
                "The corpus must be a JSON object mapping book names to chapters."
            }
            LoadError::EmptyResult { .. } => {
                "The corpus loaded but no verse could be extracted. Run `tanakh-reader stats` \
                 to list the skipped books, chapters and verses."
            }
            LoadError::Io(_) => "The corpus file could not be read. Check the path and permissions.",
            LoadError::Parse(_) => "The corpus file is not valid JSON (or valid zstd-compressed JSON).",
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::MissingCorpus => write!(f, "corpus is missing"),
            LoadError::InvalidCorpus(reason) => write!(f, "corpus is invalid: {reason}"),
            LoadError::EmptyResult { skipped } => write!(
                f,
                "no verses after flattening ({} books, {} chapters, {} verses skipped)",
                skipped.books, skipped.chapters, skipped.verses
            ),
            LoadError::Io(err) => write!(f, "io error: {err}"),
            LoadError::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(value: std::io::Error) -> Self {
        LoadError::Io(value)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(value: serde_json::Error) -> Self {
        LoadError::Parse(value)
    }
}

/// Serializable record of a failed load, kept in the reader state so the
/// front ends can show it after the error value itself is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub kind: LoadErrorKind,
    pub message: String,
    pub guidance: &'static str,
}

impl From<&LoadError> for LoadFailure {
    fn from(err: &LoadError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            guidance: err.guidance(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackError {
    SpeedOutOfRange(f32),
    NothingSelected,
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackError::SpeedOutOfRange(speed) => write!(
                f,
                "speed {speed} is outside {}..={}",
                crate::playback::MIN_SPEED,
                crate::playback::MAX_SPEED
            ),
            PlaybackError::NothingSelected => write!(f, "select a verse before playing"),
        }
    }
}

impl std::error::Error for PlaybackError {}

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "io error: {err}"),
            StoreError::Serialize(err) => write!(f, "serialization error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        StoreError::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Serialize(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::JsonKind;
    use std::collections::HashSet;

    #[test]
    fn each_failure_has_its_own_guidance() {
        let errors = [
            LoadError::MissingCorpus,
            LoadError::InvalidCorpus(InvalidReason::NotAMapping {
                found: JsonKind::Array,
            }),
            LoadError::EmptyResult {
                skipped: SkipCounts::default(),
            },
            LoadError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)),
        ];
        let guidance: HashSet<_> = errors.iter().map(LoadError::guidance).collect();
        assert_eq!(guidance.len(), errors.len());
    }

    #[test]
    fn failure_record_keeps_kind_and_message() {
        let err = LoadError::EmptyResult {
            skipped: SkipCounts {
                books: 1,
                chapters: 0,
                verses: 2,
            },
        };
        let failure = LoadFailure::from(&err);
        assert_eq!(failure.kind, LoadErrorKind::EmptyResult);
        assert_eq!(failure.message, err.to_string());
        assert_eq!(failure.guidance, err.guidance());
    }
}
