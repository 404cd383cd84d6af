//! # Timeline Module
//!
//! Aligns planned shots to the music. Beats arrive from an upstream tempo
//! detector; this module only consumes them.
//!
//! ## Core Features
//!
//! - **Beat Alignment**: snap shot edges to beats within a search radius
//! - **Phrase Extension**: widen a shot to the surrounding musical phrase
//! - **Duration Constraints**: clamp shots into their flexibility range
//!
//! ## Usage
//!
//! ```rust
//! use beatcut::timeline::{Beat, BeatSynchronizer, MusicAlignment, Shot};
//!
//! let beats = vec![Beat::new(0.0, 0.2), Beat::new(0.5, 0.9), Beat::new(1.0, 0.3)];
//! let shot = Shot::new("s1", 0.05, 0.95, "wide").with_alignment(MusicAlignment {
//!     align_start: true,
//!     align_end: true,
//!     extend_to_phrase: false,
//! });
//!
//! let clip = BeatSynchronizer::new().sync(&shot, &beats);
//! assert_eq!(clip.synced_start, 0.0);
//! assert_eq!(clip.synced_end, 0.5);
//! ```

pub mod phrase;
pub mod sync;
pub mod types;

pub use phrase::{PhraseLocator, PhraseWindow};
pub use sync::BeatSynchronizer;
pub use types::{
    beat_at_or_before, nearest_beat, Beat, DurationFlexibility, MusicAlignment, Scene, Shot,
    ShotMedia, SyncedClip,
};
