//! Owned reading-session state and the events that change it.
//!
//! The front ends hold one [`ReaderState`] and drive it with `load`,
//! `select`, `click_word` and the playback events. Nothing else mutates it.

use crate::corpus::Anomaly;
use crate::error::{LoadError, LoadFailure, PlaybackError};
use crate::lexicon::{LexiconIndex, Lookup};
use crate::normalize::{SkipCounts, normalize};
use crate::playback::{Speed, WordTiming, estimate_timings, word_at};
use crate::store::{SelectionStore, load_selection, save_selection};
use crate::verse::{Verse, VerseRef};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Maximum number of verses kept for display. Verses past the bound are
/// dropped, not paged.
pub const DEFAULT_DISPLAY_LIMIT: usize = 1000;

/// Keeps the first `limit` verses in their original order.
pub fn truncate_for_display(mut verses: Vec<Verse>, limit: usize) -> Vec<Verse> {
    if verses.len() > limit {
        debug!(total = verses.len(), limit, "truncating verse list for display");
        verses.truncate(limit);
    }
    verses
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub total_verses: usize,
    pub displayed: usize,
    pub skipped: SkipCounts,
    pub anomalies: Vec<Anomaly>,
}

#[derive(Debug, Default)]
pub struct ReaderState {
    verses: Vec<Verse>,
    total_verses: usize,
    skipped: SkipCounts,
    failure: Option<LoadFailure>,
    selected: Option<Verse>,
    highlighted: Option<usize>,
    popup: Option<Lookup>,
    speed: Speed,
    timings: Vec<WordTiming>,
    playing: bool,
}

impl ReaderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `document` and keeps at most `limit` verses.
    ///
    /// A fatal error leaves the state empty (no verses, no selection) with the
    /// failure recorded for display.
    pub fn load(&mut self, document: Option<&Value>, limit: usize) -> Result<LoadReport, LoadError> {
        match normalize(document) {
            Ok(normalized) => {
                let total_verses = normalized.verses.len();
                self.verses = truncate_for_display(normalized.verses, limit);
                self.total_verses = total_verses;
                self.skipped = normalized.skipped;
                self.failure = None;
                info!(
                    total = total_verses,
                    displayed = self.verses.len(),
                    skipped = normalized.skipped.total(),
                    "corpus loaded"
                );
                Ok(LoadReport {
                    total_verses,
                    displayed: self.verses.len(),
                    skipped: normalized.skipped,
                    anomalies: normalized.anomalies,
                })
            }
            Err(err) => {
                error!(error = %err, "corpus load failed");
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Records a failure that happened before normalization (reading the
    /// corpus file) and resets to the empty state.
    pub fn fail(&mut self, err: &LoadError) {
        *self = Self {
            speed: self.speed,
            failure: Some(LoadFailure::from(err)),
            ..Self::default()
        };
    }

    /// Restores the last selection persisted in `store`, if any.
    pub fn restore(&mut self, store: &dyn SelectionStore) -> Option<&Verse> {
        if self.failure.is_some() {
            return None;
        }
        let verse = load_selection(store)?;
        debug!(reference = %verse.reference(), "restored selection");
        self.set_selection(verse);
        self.selected.as_ref()
    }

    pub fn select_index(&mut self, index: usize, store: &dyn SelectionStore) -> Option<&Verse> {
        let verse = self.verses.get(index)?.clone();
        self.select(verse, store);
        self.selected.as_ref()
    }

    pub fn select_ref(&mut self, reference: &VerseRef, store: &dyn SelectionStore) -> Option<&Verse> {
        let (index, _) = reference.find(&self.verses)?;
        self.select_index(index, store)
    }

    /// Selects `verse` and persists it. A failed write is logged; the
    /// selection still takes effect.
    pub fn select(&mut self, verse: Verse, store: &dyn SelectionStore) {
        if let Err(err) = save_selection(store, &verse) {
            warn!(error = %err, "failed to persist selection");
        }
        self.set_selection(verse);
    }

    fn set_selection(&mut self, verse: Verse) {
        self.selected = Some(verse);
        self.highlighted = None;
        self.popup = None;
        self.timings.clear();
        self.playing = false;
    }

    /// Opens the lexicon popup for the word at `index` of the selected verse.
    pub fn click_word(&mut self, index: usize) -> Option<&Lookup> {
        let token = self.selected.as_ref()?.word(index)?.to_string();
        Some(self.click_token(&token))
    }

    pub fn click_token(&mut self, token: &str) -> &Lookup {
        let lookup = LexiconIndex::lookup_token(token);
        if !lookup.found() {
            debug!(token, "no lexicon entry for clicked word");
        }
        self.popup.insert(lookup)
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    pub fn set_speed(&mut self, value: f32) -> Result<Speed, PlaybackError> {
        let speed = Speed::new(value)?;
        self.speed = speed;
        if let Some(verse) = &self.selected {
            if !self.timings.is_empty() {
                self.timings = estimate_timings(&verse.text, speed);
            }
        }
        Ok(speed)
    }

    /// Starts playback of the selected verse from its first word.
    pub fn play(&mut self) -> Result<&[WordTiming], PlaybackError> {
        let verse = self.selected.as_ref().ok_or(PlaybackError::NothingSelected)?;
        self.timings = estimate_timings(&verse.text, self.speed);
        self.playing = true;
        self.highlighted = if self.timings.is_empty() { None } else { Some(0) };
        Ok(&self.timings)
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Moves the highlight to the word playing at `elapsed` seconds; playback
    /// ends once `elapsed` runs past the last word.
    pub fn tick(&mut self, elapsed: f32) -> Option<usize> {
        if !self.playing {
            return self.highlighted;
        }
        match word_at(&self.timings, elapsed) {
            Some(index) => self.highlighted = Some(index),
            None if elapsed >= 0.0 => self.finish(),
            None => {}
        }
        self.highlighted
    }

    pub fn finish(&mut self) {
        self.playing = false;
        self.highlighted = None;
    }

    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }

    pub fn total_verses(&self) -> usize {
        self.total_verses
    }

    pub fn skipped(&self) -> SkipCounts {
        self.skipped
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }

    pub fn selected(&self) -> Option<&Verse> {
        self.selected.as_ref()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn popup(&self) -> Option<&Lookup> {
        self.popup.as_ref()
    }

    pub fn speed(&self) -> Speed {
        self.speed
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadErrorKind;
    use crate::store::{MemoryStore, SELECTED_VERSE_KEY};
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "Genesis": [[
                ["בְּרֵאשִׁית", "בָּרָא", "אֱלֹהִים"],
                ["וַיֹּאמֶר", "אֱלֹהִים", "יְהִי", "אוֹר׃"],
            ]],
            "Exodus": [[["וְאֵלֶּה", "שְׁמוֹת"]]],
        })
    }

    fn loaded() -> ReaderState {
        let mut state = ReaderState::new();
        state.load(Some(&sample()), DEFAULT_DISPLAY_LIMIT).unwrap();
        state
    }

    #[test]
    fn truncation_keeps_the_first_records_in_order() {
        let verses: Vec<_> = (1..=1500)
            .map(|n| Verse {
                book: "Psalms".into(),
                chapter: 1,
                verse: n,
                text: n.to_string(),
            })
            .collect();
        let shown = truncate_for_display(verses.clone(), 1000);
        assert_eq!(shown.len(), 1000);
        assert_eq!(shown[..], verses[..1000]);
        assert_eq!(truncate_for_display(verses[..3].to_vec(), 1000).len(), 3);
    }

    #[test]
    fn load_applies_the_display_bound() {
        let mut state = ReaderState::new();
        let report = state.load(Some(&sample()), 2).unwrap();
        assert_eq!(report.total_verses, 3);
        assert_eq!(report.displayed, 2);
        assert_eq!(state.verses().len(), 2);
        assert_eq!(state.verses()[1].verse, 2);
    }

    #[test]
    fn fatal_errors_leave_a_distinguishable_empty_state() {
        let mut state = loaded();
        let store = MemoryStore::new();
        state.select_index(0, &store);

        let err = state.load(None, DEFAULT_DISPLAY_LIMIT).unwrap_err();
        assert!(matches!(err, LoadError::MissingCorpus));
        assert!(state.verses().is_empty());
        assert!(state.selected().is_none());
        assert_eq!(state.failure().unwrap().kind, LoadErrorKind::MissingCorpus);

        let missing_guidance = state.failure().unwrap().guidance;
        state.load(Some(&json!({})), DEFAULT_DISPLAY_LIMIT).unwrap_err();
        let failure = state.failure().unwrap();
        assert_eq!(failure.kind, LoadErrorKind::EmptyResult);
        assert_ne!(failure.guidance, missing_guidance);
    }

    #[test]
    fn selection_is_persisted_and_restored() {
        let store = MemoryStore::new();
        let mut state = loaded();
        let reference = VerseRef::new("Exodus", 1, 1);
        let chosen = state.select_ref(&reference, &store).cloned().unwrap();
        assert!(store.get(SELECTED_VERSE_KEY).is_some());

        let mut next_session = loaded();
        assert_eq!(next_session.restore(&store), Some(&chosen));
    }

    #[test]
    fn selecting_clears_popup_and_highlight() {
        let store = MemoryStore::new();
        let mut state = loaded();
        state.select_index(0, &store);
        state.click_word(2);
        state.play().unwrap();
        assert!(state.popup().is_some());
        assert_eq!(state.highlighted(), Some(0));

        state.select_index(1, &store);
        assert!(state.popup().is_none());
        assert_eq!(state.highlighted(), None);
        assert!(!state.is_playing());
    }

    #[test]
    fn clicking_a_word_opens_the_lexicon_popup() {
        let store = MemoryStore::new();
        let mut state = loaded();
        assert!(state.click_word(0).is_none());

        state.select_index(0, &store);
        let popup = state.click_word(2).cloned().unwrap();
        assert_eq!(popup.token, "אֱלֹהִים");
        assert_eq!(popup.entry.unwrap().ipa, "ʔeloˈhim");
        assert!(state.click_word(9).is_none());

        state.close_popup();
        assert!(state.popup().is_none());
    }

    #[test]
    fn playback_highlights_words_until_the_end() {
        let store = MemoryStore::new();
        let mut state = loaded();
        assert_eq!(state.play().unwrap_err(), PlaybackError::NothingSelected);

        state.select_index(1, &store);
        state.set_speed(2.0).unwrap();
        let timings = state.play().unwrap().to_vec();
        assert_eq!(timings.len(), 4);
        assert_eq!(state.tick(0.3), Some(1));
        state.pause();
        assert_eq!(state.tick(0.8), Some(1));
        state.play().unwrap();
        assert_eq!(state.tick(0.8), Some(3));
        assert_eq!(state.tick(1.0), None);
        assert!(!state.is_playing());
    }

    #[test]
    fn invalid_speed_is_rejected_and_keeps_the_previous_value() {
        let mut state = loaded();
        state.set_speed(1.5).unwrap();
        assert!(state.set_speed(3.0).is_err());
        assert_eq!(state.speed().get(), 1.5);
    }
}
