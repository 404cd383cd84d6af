//! # Transition System
//!
//! Picks the visual effect between adjacent shots.
//!
//! ## Energy Tiers
//!
//! - **High** (energy > 0.7): HardCut, WhipPan or Glitch at the shortest duration
//! - **Medium** (energy > 0.4): Crossfade or MatchCut at the midpoint duration
//! - **Low**: FadeToBlack or Crossfade at the longest duration
//!
//! Visually similar shots are joined with a MatchCut unless the tier already
//! picked a HardCut.
//!
//! ## Usage
//!
//! ```rust
//! use beatcut::config::TransitionConfig;
//! use beatcut::timeline::Shot;
//! use beatcut::transitions::{EnergyTier, TransitionSelector};
//!
//! let a = Shot::new("a", 0.0, 2.0, "wide");
//! let b = Shot::new("b", 2.0, 4.0, "close-up");
//!
//! let mut selector = TransitionSelector::seeded(TransitionConfig::default(), 7);
//! let transition = selector.select(&a, &b, 0.8, 2.0);
//! assert!(EnergyTier::High.pool().contains(&transition.kind));
//! ```

pub mod selector;
pub mod types;

pub use selector::{similarity, TransitionSelector};
pub use types::{EnergyTier, Transition, TransitionKind};
