use serde::{Deserialize, Serialize};

/// A timestamped point in the music track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Time of the beat in seconds
    pub time: f64,

    /// Normalized energy at this beat (0.0-1.0)
    pub energy: f32,
}

impl Beat {
    pub fn new(time: f64, energy: f32) -> Self {
        Self { time, energy }
    }
}

/// Find the beat closest to `time`, optionally limited to `max_distance` seconds.
///
/// Beats are expected in time order. Ties resolve to the earlier beat.
pub fn nearest_beat(beats: &[Beat], time: f64, max_distance: Option<f64>) -> Option<&Beat> {
    if beats.is_empty() {
        return None;
    }

    // First beat at or after `time`; the nearest is it or its predecessor
    let idx = beats.partition_point(|beat| beat.time < time);
    let before = idx.checked_sub(1).and_then(|i| beats.get(i));
    let after = beats.get(idx);

    let nearest = match (before, after) {
        (Some(b), Some(a)) => {
            if (time - b.time).abs() <= (a.time - time).abs() { b } else { a }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    match max_distance {
        Some(radius) if (nearest.time - time).abs() > radius => None,
        _ => Some(nearest),
    }
}

/// Find the latest beat at or before `time`, no further than `max_distance` seconds back
pub fn beat_at_or_before(beats: &[Beat], time: f64, max_distance: f64) -> Option<&Beat> {
    let idx = beats.partition_point(|beat| beat.time <= time);
    idx.checked_sub(1)
        .and_then(|i| beats.get(i))
        .filter(|beat| time - beat.time <= max_distance)
}

/// Allowed duration range for a shot after synchronization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationFlexibility {
    pub min: f64,
    pub max: f64,
}

impl DurationFlexibility {
    pub fn clamp(&self, duration: f64) -> f64 {
        duration.max(self.min).min(self.max)
    }
}

/// Which edges of a shot should follow the music
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicAlignment {
    pub align_start: bool,
    pub align_end: bool,
    pub extend_to_phrase: bool,
}

/// Media backing a shot. At least one reference must be present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShotMedia {
    pub still_image_ref: Option<String>,
    pub clip_ref: Option<String>,
}

impl ShotMedia {
    pub fn still(reference: impl Into<String>) -> Self {
        Self { still_image_ref: Some(reference.into()), clip_ref: None }
    }

    pub fn clip(reference: impl Into<String>) -> Self {
        Self { still_image_ref: None, clip_ref: Some(reference.into()) }
    }

    /// The reference handed to the renderer. Clips win over stills.
    pub fn primary_ref(&self) -> Option<&str> {
        self.clip_ref
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.still_image_ref.as_deref().filter(|r| !r.trim().is_empty()))
    }

    pub fn is_still(&self) -> bool {
        self.clip_ref.as_deref().map_or(true, |r| r.trim().is_empty())
            && self.still_image_ref.is_some()
    }
}

/// One planned shot from the upstream shot list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shot {
    pub id: String,

    /// Nominal start time in seconds
    pub start: f64,

    /// Nominal end time in seconds
    pub end: f64,

    /// Framing, e.g. "wide", "close-up"
    pub shot_type: String,

    #[serde(default)]
    pub location_ref: Option<String>,

    #[serde(default)]
    pub character_refs: Vec<String>,

    #[serde(default)]
    pub duration_flexibility: Option<DurationFlexibility>,

    #[serde(default)]
    pub music_alignment: Option<MusicAlignment>,

    #[serde(default)]
    pub media: ShotMedia,

    /// Free-text label shown in render diagnostics
    #[serde(default)]
    pub description: Option<String>,
}

impl Shot {
    pub fn new(id: impl Into<String>, start: f64, end: f64, shot_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            shot_type: shot_type.into(),
            location_ref: None,
            character_refs: Vec::new(),
            duration_flexibility: None,
            music_alignment: None,
            media: ShotMedia::default(),
            description: None,
        }
    }

    pub fn with_media(mut self, media: ShotMedia) -> Self {
        self.media = media;
        self
    }

    pub fn with_alignment(mut self, alignment: MusicAlignment) -> Self {
        self.music_alignment = Some(alignment);
        self
    }

    pub fn with_flexibility(mut self, min: f64, max: f64) -> Self {
        self.duration_flexibility = Some(DurationFlexibility { min, max });
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location_ref = Some(location.into());
        self
    }

    pub fn with_characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.character_refs = characters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Label used for render items when no description was supplied
    pub fn label(&self) -> String {
        match (&self.description, &self.location_ref) {
            (Some(description), _) => description.clone(),
            (None, Some(location)) => format!("{} @ {}", self.shot_type, location),
            (None, None) => format!("{} ({})", self.shot_type, self.id),
        }
    }
}

/// A scene: an ordered run of shots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: String,
    pub shots: Vec<Shot>,
}

impl Scene {
    pub fn new(id: impl Into<String>, shots: Vec<Shot>) -> Self {
        Self { id: id.into(), shots }
    }
}

/// A shot's time range after beat synchronization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncedClip {
    pub shot_id: String,
    pub original_start: f64,
    pub original_end: f64,
    pub synced_start: f64,
    pub synced_end: f64,
    pub timing_offset_ms: f64,

    /// Beat times the synced edges landed on
    pub aligned_beats: Vec<f64>,

    /// Whether the range was widened to a phrase window
    #[serde(default)]
    pub phrase_extended: bool,

    /// Whether the duration clamp moved the end edge
    #[serde(default)]
    pub duration_clamped: bool,
}

impl SyncedClip {
    pub fn duration(&self) -> f64 {
        self.synced_end - self.synced_start
    }

    pub fn is_beat_aligned(&self) -> bool {
        !self.aligned_beats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats() -> Vec<Beat> {
        vec![Beat::new(0.0, 0.2), Beat::new(0.5, 0.9), Beat::new(1.0, 0.3)]
    }

    #[test]
    fn test_nearest_beat() {
        let beats = beats();
        assert_eq!(nearest_beat(&beats, 0.05, None).unwrap().time, 0.0);
        assert_eq!(nearest_beat(&beats, 0.95, None).unwrap().time, 1.0);
        assert_eq!(nearest_beat(&beats, 7.0, None).unwrap().time, 1.0);
        assert_eq!(nearest_beat(&beats, -3.0, None).unwrap().time, 0.0);
    }

    #[test]
    fn test_nearest_beat_tie_prefers_earlier() {
        let beats = beats();
        assert_eq!(nearest_beat(&beats, 0.25, None).unwrap().time, 0.0);
    }

    #[test]
    fn test_nearest_beat_radius() {
        let beats = beats();
        assert!(nearest_beat(&beats, 2.5, Some(1.0)).is_none());
        assert_eq!(nearest_beat(&beats, 1.8, Some(1.0)).unwrap().time, 1.0);
        assert!(nearest_beat(&[], 1.0, None).is_none());
    }

    #[test]
    fn test_beat_at_or_before() {
        let beats = beats();
        assert_eq!(beat_at_or_before(&beats, 0.95, 1.0).unwrap().time, 0.5);
        assert_eq!(beat_at_or_before(&beats, 1.0, 1.0).unwrap().time, 1.0);
        assert!(beat_at_or_before(&beats, -0.1, 1.0).is_none());
        assert!(beat_at_or_before(&beats, 2.5, 1.0).is_none());
    }

    #[test]
    fn test_primary_media_ref() {
        let mut media = ShotMedia::still("still.png");
        assert_eq!(media.primary_ref(), Some("still.png"));
        assert!(media.is_still());

        media.clip_ref = Some("clip.mp4".to_string());
        assert_eq!(media.primary_ref(), Some("clip.mp4"));
        assert!(!media.is_still());

        assert_eq!(ShotMedia::default().primary_ref(), None);
        assert_eq!(ShotMedia::clip("  ").primary_ref(), None);
    }

    #[test]
    fn test_shot_deserializes_from_camel_case() {
        let json = r#"{
            "id": "s1", "start": 0.0, "end": 2.0, "shotType": "wide",
            "characterRefs": ["ana"],
            "musicAlignment": {"alignStart": true},
            "media": {"stillImageRef": "https://cdn.example.com/s1.png"}
        }"#;
        let shot: Shot = serde_json::from_str(json).unwrap();
        let alignment = shot.music_alignment.unwrap();
        assert!(alignment.align_start);
        assert!(!alignment.align_end);
        assert_eq!(shot.character_refs, vec!["ana".to_string()]);
        assert_eq!(shot.media.primary_ref(), Some("https://cdn.example.com/s1.png"));
    }
}
