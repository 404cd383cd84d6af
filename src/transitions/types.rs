use std::fmt;

use serde::{Deserialize, Serialize};

/// Visual effect bridging two adjacent shots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    HardCut,
    WhipPan,
    Glitch,
    Crossfade,
    MatchCut,
    FadeToBlack,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardCut => "HardCut",
            Self::WhipPan => "WhipPan",
            Self::Glitch => "Glitch",
            Self::Crossfade => "Crossfade",
            Self::MatchCut => "MatchCut",
            Self::FadeToBlack => "FadeToBlack",
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Energy band of a shot boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnergyTier {
    High,
    Medium,
    Low,
}

impl EnergyTier {
    /// Transition kinds a boundary in this tier may use
    pub fn pool(&self) -> &'static [TransitionKind] {
        match self {
            Self::High => &[TransitionKind::HardCut, TransitionKind::WhipPan, TransitionKind::Glitch],
            Self::Medium => &[TransitionKind::Crossfade, TransitionKind::MatchCut],
            Self::Low => &[TransitionKind::FadeToBlack, TransitionKind::Crossfade],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high-energy",
            Self::Medium => "medium-energy",
            Self::Low => "low-energy",
        }
    }
}

/// A selected transition between two shots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: TransitionKind,

    pub duration_seconds: f64,

    /// Energy percentage and override notes; downstream logs use this verbatim
    pub description: String,

    /// Whether visual similarity forced a match cut
    #[serde(default)]
    pub similarity_override: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pools_are_disjoint_where_required() {
        assert!(EnergyTier::High.pool().contains(&TransitionKind::HardCut));
        assert!(!EnergyTier::Medium.pool().contains(&TransitionKind::HardCut));
        assert!(!EnergyTier::Low.pool().contains(&TransitionKind::MatchCut));
    }

    #[test]
    fn test_transition_serializes_type_field() {
        let transition = Transition {
            kind: TransitionKind::WhipPan,
            duration_seconds: 0.2,
            description: "WhipPan".to_string(),
            similarity_override: false,
        };
        let json = serde_json::to_value(&transition).unwrap();
        assert_eq!(json["type"], "WhipPan");
        assert_eq!(json["durationSeconds"], 0.2);
    }
}
