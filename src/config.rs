use crate::bundled;
use crate::error::LoadError;
use crate::reader::{DEFAULT_DISPLAY_LIMIT, LoadReport, ReaderState};
use std::path::PathBuf;

pub const DEFAULT_STORE_PATH: &str = ".tanakh-reader/selection.json";

/// Where the corpus and the persisted selection come from.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Corpus file to read instead of the bundled corpus.
    pub corpus_path: Option<PathBuf>,
    pub store_path: PathBuf,
    pub display_limit: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            corpus_path: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            display_limit: DEFAULT_DISPLAY_LIMIT,
        }
    }
}

impl ReaderConfig {
    /// Loads the configured corpus into a fresh state. On failure the state
    /// is returned empty, carrying the failure for display.
    pub fn load_state(&self) -> (ReaderState, Result<LoadReport, LoadError>) {
        let mut state = ReaderState::new();
        let result = match &self.corpus_path {
            Some(path) => match bundled::load_path(path) {
                Ok(document) => state.load(Some(&document), self.display_limit),
                Err(err) => {
                    state.fail(&err);
                    Err(err)
                }
            },
            None => state.load(bundled::corpus(), self.display_limit),
        };
        (state, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;

    #[test]
    fn default_config_loads_the_bundled_corpus() {
        let (state, result) = ReaderConfig::default().load_state();
        let report = result.unwrap();
        assert_eq!(report.displayed, state.verses().len());
        assert!(state.failure().is_none());
    }

    #[test]
    fn unreadable_corpus_path_records_the_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ReaderConfig {
            corpus_path: Some(dir.path().join("missing.json")),
            ..ReaderConfig::default()
        };
        let (state, result) = config.load_state();
        assert!(matches!(result, Err(LoadError::Io(_))));
        assert_eq!(state.failure().unwrap().kind, LoadErrorKind::Io);
        assert!(state.verses().is_empty());
    }
}
