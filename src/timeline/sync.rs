use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use rayon::prelude::*;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::timeline::phrase::PhraseLocator;
use crate::timeline::types::{beat_at_or_before, nearest_beat, Beat, Shot, SyncedClip};

/// Aligns shot boundaries to nearby beats and duration constraints
#[derive(Debug, Clone)]
pub struct BeatSynchronizer {
    search_radius: f64,
    worker_threads: usize,
    phrases: PhraseLocator,

    /// Built on first use, shared by clones
    pool: Arc<OnceLock<rayon::ThreadPool>>,
}

impl BeatSynchronizer {
    /// Create a synchronizer with default configuration
    pub fn new() -> Self {
        Self::with_config(&SyncConfig::default())
    }

    /// Create a synchronizer with custom configuration
    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            search_radius: config.search_radius,
            worker_threads: config.worker_threads.max(1),
            phrases: PhraseLocator::from_config(config),
            pool: Arc::new(OnceLock::new()),
        }
    }

    /// Compute the synced range for a single shot.
    ///
    /// The start edge snaps to the nearest beat; the end edge snaps to the
    /// nearest beat at or before the planned end, so alignment never runs a
    /// shot past its slot. Order of adjustments: beat alignment, phrase
    /// extension, duration clamp. Only the end edge moves during the clamp.
    pub fn sync(&self, shot: &Shot, beats: &[Beat]) -> SyncedClip {
        let alignment = shot.music_alignment.unwrap_or_default();

        let mut start = shot.start;
        let mut end = shot.end;
        let mut start_beat = None;
        let mut end_beat = None;

        if alignment.align_start {
            if let Some(beat) = nearest_beat(beats, shot.start, Some(self.search_radius)) {
                start = beat.time;
                start_beat = Some(beat.time);
            }
        }

        if alignment.align_end {
            if let Some(beat) = beat_at_or_before(beats, shot.end, self.search_radius) {
                end = beat.time;
                end_beat = Some(beat.time);
            }
        }

        // Both edges snapped to the same beat, or crossed: give back the end first
        if end <= start && end_beat.is_some() {
            end = shot.end;
            end_beat = None;
        }
        // The start beat lies past the planned end: keep the snap, carry the duration
        if end <= start {
            end = start + shot.duration();
        }

        let mut phrase_extended = false;
        if alignment.extend_to_phrase {
            if let Some(window) = self.phrases.phrase_for(start, end, beats) {
                if window.start < start {
                    start = window.start;
                    start_beat = None;
                    phrase_extended = true;
                }
                if window.end > end {
                    end = window.end;
                    end_beat = None;
                    phrase_extended = true;
                }
            }
        }

        let mut duration_clamped = false;
        if let Some(flex) = shot.duration_flexibility {
            let duration = end - start;
            let clamped = flex.clamp(duration);
            if (clamped - duration).abs() > f64::EPSILON {
                end = start + clamped;
                end_beat = None;
                duration_clamped = true;
            }
        }

        if end <= start {
            end = start + shot.duration().max(f64::EPSILON);
            end_beat = None;
        }

        let mut aligned_beats: Vec<f64> = start_beat.into_iter().chain(end_beat).collect();
        aligned_beats.dedup();

        SyncedClip {
            shot_id: shot.id.clone(),
            original_start: shot.start,
            original_end: shot.end,
            synced_start: start,
            synced_end: end,
            timing_offset_ms: (start - shot.start).abs() * 1000.0,
            aligned_beats,
            phrase_extended,
            duration_clamped,
        }
    }

    /// Synchronize many shots on a bounded worker pool.
    ///
    /// Results are keyed by shot id so ordering never depends on completion order.
    pub fn sync_all<'a, I>(&self, shots: I, beats: &[Beat]) -> Result<BTreeMap<String, SyncedClip>>
    where
        I: IntoIterator<Item = &'a Shot>,
    {
        let shots: Vec<&Shot> = shots.into_iter().collect();

        let pool = self.pool()?;

        let clips: Vec<SyncedClip> = pool.install(|| {
            shots
                .par_iter()
                .map(|shot| self.sync(shot, beats))
                .collect()
        });

        let mut synced = BTreeMap::new();
        for clip in clips {
            debug!(
                "Synced '{}': {:.3}s-{:.3}s -> {:.3}s-{:.3}s (offset {:.1}ms, beats {:?})",
                clip.shot_id, clip.original_start, clip.original_end,
                clip.synced_start, clip.synced_end, clip.timing_offset_ms, clip.aligned_beats
            );
            synced.insert(clip.shot_id.clone(), clip);
        }

        Ok(synced)
    }
}

impl BeatSynchronizer {
    fn pool(&self) -> Result<&rayon::ThreadPool> {
        if self.pool.get().is_none() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.worker_threads)
                .build()
                .map_err(|e| SyncError::PoolFailed { reason: e.to_string() })?;
            debug!("Built sync pool with {} workers", self.worker_threads);
            // A concurrent caller may have won the race; either pool is fine
            let _ = self.pool.set(pool);
        }

        self.pool
            .get()
            .ok_or_else(|| SyncError::PoolFailed { reason: "pool was not initialized".to_string() }.into())
    }
}

impl Default for BeatSynchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::types::MusicAlignment;

    fn align(start: bool, end: bool, phrase: bool) -> MusicAlignment {
        MusicAlignment { align_start: start, align_end: end, extend_to_phrase: phrase }
    }

    fn small_beats() -> Vec<Beat> {
        vec![Beat::new(0.0, 0.2), Beat::new(0.5, 0.9), Beat::new(1.0, 0.3)]
    }

    fn steady_beats(count: usize, interval: f64) -> Vec<Beat> {
        (0..count).map(|i| Beat::new(i as f64 * interval, 0.5)).collect()
    }

    #[test]
    fn test_align_both_edges() {
        let beats = small_beats();
        let shot = Shot::new("s1", 0.05, 0.95, "wide").with_alignment(align(true, true, false));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert_eq!(clip.synced_start, 0.0);
        assert_eq!(clip.synced_end, 0.5);
        assert_eq!(clip.aligned_beats, vec![0.0, 0.5]);
        assert!((clip.timing_offset_ms - 50.0).abs() < 1e-6);
    }

    #[test]
    fn test_end_never_snaps_past_planned_end() {
        let beats = steady_beats(10, 0.5);
        let shot = Shot::new("s1", 1.0, 2.45, "wide").with_alignment(align(false, true, false));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert_eq!(clip.synced_end, 2.0);
        assert!(clip.synced_end <= shot.end);
    }

    #[test]
    fn test_no_alignment_is_noop() {
        let shot = Shot::new("s1", 0.3, 2.7, "close-up");
        let clip = BeatSynchronizer::new().sync(&shot, &steady_beats(20, 0.5));

        assert_eq!(clip.synced_start, shot.start);
        assert_eq!(clip.synced_end, shot.end);
        assert!(clip.aligned_beats.is_empty());
        assert_eq!(clip.timing_offset_ms, 0.0);
    }

    #[test]
    fn test_align_start_hits_beat_exactly() {
        let beats = steady_beats(40, 0.47);
        let synchronizer = BeatSynchronizer::new();

        for i in 0..30 {
            let start = 0.13 + i as f64 * 0.31;
            let shot = Shot::new(format!("s{}", i), start, start + 2.0, "wide")
                .with_alignment(align(true, false, false));
            let clip = synchronizer.sync(&shot, &beats);
            let expected = nearest_beat(&beats, start, Some(1.0)).unwrap().time;
            assert_eq!(clip.synced_start, expected);
        }
    }

    #[test]
    fn test_beat_outside_radius_is_ignored() {
        let beats = vec![Beat::new(0.0, 0.5), Beat::new(10.0, 0.5)];
        let shot = Shot::new("s1", 3.0, 5.0, "wide").with_alignment(align(true, true, false));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert_eq!(clip.synced_start, 3.0);
        assert_eq!(clip.synced_end, 5.0);
        assert!(clip.aligned_beats.is_empty());
    }

    #[test]
    fn test_collapsed_range_keeps_original_end() {
        let beats = vec![Beat::new(1.0, 0.5)];
        let shot = Shot::new("s1", 0.9, 1.2, "wide").with_alignment(align(true, true, false));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert_eq!(clip.synced_start, 1.0);
        assert_eq!(clip.synced_end, 1.2);
        assert!(clip.synced_end > clip.synced_start);
        assert_eq!(clip.aligned_beats, vec![1.0]);
    }

    #[test]
    fn test_start_beat_past_planned_end_keeps_snap() {
        let beats = small_beats();
        let shot = Shot::new("s1", 0.3, 0.45, "insert").with_alignment(align(true, false, false));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        let expected = nearest_beat(&beats, 0.3, Some(1.0)).unwrap().time;
        assert_eq!(expected, 0.5);
        assert_eq!(clip.synced_start, 0.5);
        assert!((clip.synced_end - 0.65).abs() < 1e-9);
        assert_eq!(clip.aligned_beats, vec![0.5]);
    }

    #[test]
    fn test_extend_to_phrase_widens() {
        let beats = steady_beats(32, 0.5);
        let shot = Shot::new("s1", 2.5, 4.1, "wide").with_alignment(align(false, false, true));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert!((clip.synced_start - 2.0).abs() < 1e-9);
        assert!((clip.synced_end - 6.0).abs() < 1e-9);
        assert!(clip.phrase_extended);
    }

    #[test]
    fn test_extend_to_phrase_without_enough_beats_is_noop() {
        let beats = steady_beats(5, 0.5);
        let shot = Shot::new("s1", 0.3, 1.1, "wide").with_alignment(align(false, false, true));
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert_eq!(clip.synced_start, 0.3);
        assert_eq!(clip.synced_end, 1.1);
        assert!(!clip.phrase_extended);
    }

    #[test]
    fn test_flexibility_moves_end_only() {
        let beats = steady_beats(32, 0.5);
        let shot = Shot::new("s1", 2.5, 4.1, "wide")
            .with_alignment(align(false, false, true))
            .with_flexibility(1.0, 3.0);
        let clip = BeatSynchronizer::new().sync(&shot, &beats);

        assert!((clip.synced_start - 2.0).abs() < 1e-9);
        assert!((clip.duration() - 3.0).abs() < 1e-9);
        assert!(clip.duration_clamped);

        let shot = Shot::new("s2", 1.0, 1.2, "wide").with_flexibility(0.8, 2.0);
        let clip = BeatSynchronizer::new().sync(&shot, &beats);
        assert_eq!(clip.synced_start, 1.0);
        assert!((clip.synced_end - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_sync_all_is_keyed_and_deterministic() {
        let beats = steady_beats(64, 0.5);
        let shots: Vec<Shot> = (0..50)
            .map(|i| {
                let start = i as f64 * 0.6 + 0.1;
                Shot::new(format!("shot-{:02}", i), start, start + 0.6, "wide")
                    .with_alignment(align(true, true, false))
            })
            .collect();

        let synchronizer = BeatSynchronizer::new();
        let first = synchronizer.sync_all(&shots, &beats).unwrap();
        let second = synchronizer.sync_all(&shots, &beats).unwrap();

        assert_eq!(first.len(), 50);
        assert!(Arc::ptr_eq(&synchronizer.pool, &synchronizer.clone().pool));
        assert!(synchronizer.pool.get().is_some());
        assert_eq!(first, second);
        for shot in &shots {
            assert_eq!(first[&shot.id], synchronizer.sync(shot, &beats));
        }
    }
}
