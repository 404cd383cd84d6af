use serde::{Deserialize, Serialize};

use crate::config::SyncConfig;
use crate::timeline::types::Beat;

/// A phrase-aligned window on the track timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhraseWindow {
    pub start: f64,
    pub end: f64,
}

/// Estimates the repeating phrase length from beat spacing.
///
/// The estimate is `beats_per_phrase` times the mean of the leading beat gaps.
/// Four beats per phrase is a tunable default, not an analysis result.
#[derive(Debug, Clone)]
pub struct PhraseLocator {
    beats_per_phrase: usize,
    min_beats: usize,
    sample_gaps: usize,
}

impl PhraseLocator {
    pub fn new() -> Self {
        Self::from_config(&SyncConfig::default())
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            beats_per_phrase: config.beats_per_phrase,
            min_beats: config.min_phrase_beats,
            sample_gaps: config.phrase_sample_gaps,
        }
    }

    /// Estimated phrase length in seconds, or `None` with too few beats
    pub fn phrase_length(&self, beats: &[Beat]) -> Option<f64> {
        if beats.len() < self.min_beats {
            return None;
        }

        let gaps: Vec<f64> = beats
            .windows(2)
            .take(self.sample_gaps)
            .map(|pair| pair[1].time - pair[0].time)
            .collect();

        if gaps.is_empty() {
            return None;
        }

        let mean_gap = gaps.iter().sum::<f64>() / gaps.len() as f64;
        let length = mean_gap * self.beats_per_phrase as f64;

        // Duplicate or unordered beats can make the estimate useless
        if length.is_finite() && length > 0.0 {
            Some(length)
        } else {
            None
        }
    }

    /// The phrase window containing `[start, end]`, measured from time zero
    pub fn phrase_for(&self, start: f64, end: f64, beats: &[Beat]) -> Option<PhraseWindow> {
        let length = self.phrase_length(beats)?;

        let window = PhraseWindow {
            start: (start / length).floor() * length,
            end: (end / length).ceil() * length,
        };

        tracing::debug!(
            "Phrase window for {:.3}s-{:.3}s: {:.3}s-{:.3}s (phrase {:.3}s)",
            start, end, window.start, window.end, length
        );

        Some(window)
    }
}

impl Default for PhraseLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steady_beats(count: usize, interval: f64) -> Vec<Beat> {
        (0..count).map(|i| Beat::new(i as f64 * interval, 0.5)).collect()
    }

    #[test]
    fn test_requires_eight_beats() {
        let locator = PhraseLocator::new();
        assert!(locator.phrase_for(0.0, 1.0, &steady_beats(7, 0.5)).is_none());
        assert!(locator.phrase_for(0.0, 1.0, &steady_beats(8, 0.5)).is_some());
    }

    #[test]
    fn test_phrase_length_is_four_mean_gaps() {
        let locator = PhraseLocator::new();
        let length = locator.phrase_length(&steady_beats(32, 0.5)).unwrap();
        assert!((length - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_leading_gaps_are_sampled() {
        let locator = PhraseLocator::new();
        // 17 beats at 0.5s spacing (16 gaps), then a much slower tail
        let mut beats = steady_beats(17, 0.5);
        beats.extend((1..10).map(|i| Beat::new(8.0 + i as f64 * 3.0, 0.5)));

        let length = locator.phrase_length(&beats).unwrap();
        assert!((length - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_contains_range() {
        let locator = PhraseLocator::new();
        let window = locator.phrase_for(2.5, 4.1, &steady_beats(16, 0.5)).unwrap();
        assert!((window.start - 2.0).abs() < 1e-9);
        assert!((window.end - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_beats_give_no_estimate() {
        let locator = PhraseLocator::new();
        let beats = vec![Beat::new(1.0, 0.5); 10];
        assert!(locator.phrase_for(0.0, 1.0, &beats).is_none());
    }
}
