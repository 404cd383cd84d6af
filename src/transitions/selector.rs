use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::TransitionConfig;
use crate::timeline::Shot;
use crate::transitions::types::{EnergyTier, Transition, TransitionKind};

const SHOT_TYPE_WEIGHT: f32 = 0.3;
const LOCATION_WEIGHT: f32 = 0.3;
const CHARACTER_WEIGHT: f32 = 0.4;

/// Visual similarity of two shots in `[0, 1]`.
///
/// Shot type and location each contribute 0.3 on an exact match; character
/// overlap contributes 0.4 scaled by `|shared| / max(|a|, |b|, 1)`.
pub fn similarity(a: &Shot, b: &Shot) -> f32 {
    let mut score = 0.0;

    if a.shot_type == b.shot_type {
        score += SHOT_TYPE_WEIGHT;
    }

    if a.location_ref.is_some() && a.location_ref == b.location_ref {
        score += LOCATION_WEIGHT;
    }

    let chars_a: HashSet<&str> = a.character_refs.iter().map(String::as_str).collect();
    let chars_b: HashSet<&str> = b.character_refs.iter().map(String::as_str).collect();
    let shared = chars_a.intersection(&chars_b).count();
    let denominator = chars_a.len().max(chars_b.len()).max(1);
    score += CHARACTER_WEIGHT * shared as f32 / denominator as f32;

    score.clamp(0.0, 1.0)
}

/// Chooses transitions from boundary energy and shot similarity.
///
/// The pick within an energy tier comes from the injected RNG; seed it for
/// reproducible assemblies.
pub struct TransitionSelector<R: Rng = SmallRng> {
    config: TransitionConfig,
    rng: R,
}

impl TransitionSelector<SmallRng> {
    /// Create a selector with an entropy-seeded RNG
    pub fn new(config: TransitionConfig) -> Self {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Create a selector whose picks are reproducible
    pub fn seeded(config: TransitionConfig, seed: u64) -> Self {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TransitionSelector<R> {
    pub fn with_rng(config: TransitionConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Energy tier for a boundary; non-finite energy counts as silence
    pub fn tier(&self, energy: f32) -> EnergyTier {
        let energy = if energy.is_finite() { energy } else { 0.0 };

        if energy > self.config.high_energy_threshold {
            EnergyTier::High
        } else if energy > self.config.medium_energy_threshold {
            EnergyTier::Medium
        } else {
            EnergyTier::Low
        }
    }

    fn tier_duration(&self, tier: EnergyTier) -> f64 {
        let duration = match tier {
            EnergyTier::High => self.config.min_duration,
            EnergyTier::Medium => self.config.mid_duration(),
            EnergyTier::Low => self.config.max_duration,
        };
        duration.clamp(self.config.min_duration, self.config.max_duration)
    }

    /// Select the transition from `shot_a` into `shot_b`
    pub fn select(&mut self, shot_a: &Shot, shot_b: &Shot, energy: f32, boundary_time: f64) -> Transition {
        let tier = self.tier(energy);
        let picked = tier
            .pool()
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(TransitionKind::Crossfade);

        let energy_pct = if energy.is_finite() { energy.clamp(0.0, 1.0) * 100.0 } else { 0.0 };
        let mut description = format!(
            "{} on {} boundary at {:.2}s (energy {:.0}%)",
            picked, tier.label(), boundary_time, energy_pct
        );

        let score = similarity(shot_a, shot_b);
        let mut kind = picked;
        let mut similarity_override = false;

        if score > self.config.similarity_threshold && picked != TransitionKind::HardCut {
            if picked != TransitionKind::MatchCut {
                description.push_str(&format!(
                    "; similarity {:.0}% forced MatchCut over {}",
                    score * 100.0, picked
                ));
            } else {
                description.push_str(&format!("; similarity {:.0}% confirms MatchCut", score * 100.0));
            }
            kind = TransitionKind::MatchCut;
            similarity_override = true;
        }

        tracing::debug!(
            "Transition '{}' -> '{}': {} ({:.2}s)",
            shot_a.id, shot_b.id, description, self.tier_duration(tier)
        );

        Transition {
            kind,
            duration_seconds: self.tier_duration(tier),
            description,
            similarity_override,
        }
    }
}
