//! Reading companion for a vocalized Hebrew Bible corpus.
//!
//! The corpus is a JSON document mapping book names to chapters of verses of
//! word tokens. [`normalize`] flattens it into [`Verse`] records,
//! [`ReaderState`] carries a reading session (selection, lexicon popup,
//! playback highlighting), and [`LexiconIndex`] serves the embedded
//! pronunciation and morphology data.

mod data;

pub mod bundled;
pub mod config;
pub mod corpus;
pub mod error;
pub mod lexicon;
pub mod normalize;
pub mod playback;
pub mod reader;
pub mod store;
pub mod verse;
#[cfg(feature = "web")]
pub mod web;

pub use config::ReaderConfig;
pub use corpus::{Anomaly, Corpus, InvalidReason, Validation};
pub use error::{LoadError, LoadErrorKind, LoadFailure, PlaybackError, StoreError};
pub use lexicon::{Annotation, LexiconEntry, LexiconIndex, Lookup};
pub use normalize::{Normalized, SkipCounts, normalize};
pub use playback::{Speed, WordTiming};
pub use reader::{DEFAULT_DISPLAY_LIMIT, LoadReport, ReaderState};
pub use store::{FileStore, MemoryStore, SELECTED_VERSE_KEY, SelectionStore};
pub use verse::{Verse, VerseRef};
