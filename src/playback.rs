//! Playback speed and per-word timing estimates for highlighting.
//!
//! No audio is synthesized here. Timings assume a fixed duration per word at
//! normal speed, scaled by the playback speed, and are indexed the same way
//! the reading view splits a verse into words.

use crate::error::PlaybackError;
use serde::{Deserialize, Serialize};

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;
pub const DEFAULT_SPEED: f32 = 1.0;
pub const SECONDS_PER_WORD: f32 = 0.5;

/// Playback rate, snapped to the slider's 0.1 step.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Speed(f32);

impl Speed {
    pub fn new(value: f32) -> Result<Self, PlaybackError> {
        if !value.is_finite() || !(MIN_SPEED..=MAX_SPEED).contains(&value) {
            return Err(PlaybackError::SpeedOutOfRange(value));
        }
        Ok(Self((value * 10.0).round() / 10.0))
    }

    pub fn get(self) -> f32 {
        self.0
    }

    /// Slower than normal speed; the synthesizer's slow mode applies.
    pub fn is_slow(self) -> bool {
        self.0 < DEFAULT_SPEED
    }
}

impl Default for Speed {
    fn default() -> Self {
        Self(DEFAULT_SPEED)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f32,
    pub end: f32,
}

pub fn estimate_timings(text: &str, speed: Speed) -> Vec<WordTiming> {
    let step = SECONDS_PER_WORD / speed.get();
    text.split(' ')
        .enumerate()
        .map(|(idx, word)| WordTiming {
            word: word.to_string(),
            start: idx as f32 * step,
            end: (idx + 1) as f32 * step,
        })
        .collect()
}

/// Index of the word being spoken at `elapsed` seconds.
pub fn word_at(timings: &[WordTiming], elapsed: f32) -> Option<usize> {
    if elapsed < 0.0 {
        return None;
    }
    timings
        .iter()
        .position(|timing| timing.start <= elapsed && elapsed < timing.end)
}

pub fn total_duration(timings: &[WordTiming]) -> f32 {
    timings.last().map(|timing| timing.end).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_bounds_are_inclusive() {
        assert!(Speed::new(0.5).is_ok());
        assert!(Speed::new(2.0).is_ok());
        assert_eq!(Speed::new(0.4), Err(PlaybackError::SpeedOutOfRange(0.4)));
        assert!(Speed::new(2.1).is_err());
        assert!(Speed::new(f32::NAN).is_err());
    }

    #[test]
    fn speed_snaps_to_slider_step() {
        assert_eq!(Speed::new(1.26).unwrap().get(), 1.3);
        assert!(Speed::new(0.9).unwrap().is_slow());
        assert!(!Speed::default().is_slow());
    }

    #[test]
    fn timings_scale_with_speed() {
        let timings = estimate_timings("a b c", Speed::new(2.0).unwrap());
        assert_eq!(timings.len(), 3);
        assert_eq!(timings[0].start, 0.0);
        assert_eq!(timings[0].end, 0.25);
        assert_eq!(timings[2].word, "c");
        assert_eq!(total_duration(&timings), 0.75);

        let normal = estimate_timings("a b", Speed::default());
        assert_eq!(normal[1].start, 0.5);
        assert_eq!(normal[1].end, 1.0);
    }

    #[test]
    fn word_at_finds_the_active_word() {
        let timings = estimate_timings("a b c", Speed::default());
        assert_eq!(word_at(&timings, 0.0), Some(0));
        assert_eq!(word_at(&timings, 0.7), Some(1));
        assert_eq!(word_at(&timings, 1.49), Some(2));
        assert_eq!(word_at(&timings, 1.5), None);
        assert_eq!(word_at(&timings, -1.0), None);
    }
}
