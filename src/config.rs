use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration for beatcut
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Beat synchronization settings
    pub sync: SyncConfig,

    /// Transition selection settings
    pub transitions: TransitionConfig,

    /// Renderer settings
    pub render: RenderConfig,

    /// Quality report settings
    pub quality: QualityConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.sync.validate()?;
        self.transitions.validate()?;
        self.render.validate()?;
        self.quality.validate()?;
        Ok(())
    }
}

fn invalid<V: ToString>(key: &str, value: V) -> crate::error::AssemblyError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }.into()
}

/// Beat synchronization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum distance (seconds) between a shot edge and the beat it snaps to
    pub search_radius: f64,

    /// Beats per phrase. Four is a pop-music rule of thumb, not a measurement.
    pub beats_per_phrase: usize,

    /// Minimum number of beats needed before a phrase length is estimated
    pub min_phrase_beats: usize,

    /// How many leading beat-to-beat gaps feed the phrase estimate
    pub phrase_sample_gaps: usize,

    /// Worker threads for the SyncAll stage (defaults to the CPU count)
    pub worker_threads: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            search_radius: 1.0,
            beats_per_phrase: 4,
            min_phrase_beats: 8,
            phrase_sample_gaps: 16,
            worker_threads: num_cpus::get(),
        }
    }
}

impl SyncConfig {
    fn validate(&self) -> Result<()> {
        if !(self.search_radius > 0.0) {
            return Err(invalid("sync.search_radius", self.search_radius));
        }

        if self.beats_per_phrase == 0 {
            return Err(invalid("sync.beats_per_phrase", self.beats_per_phrase));
        }

        if self.min_phrase_beats < 2 {
            return Err(invalid("sync.min_phrase_beats", self.min_phrase_beats));
        }

        if self.phrase_sample_gaps == 0 {
            return Err(invalid("sync.phrase_sample_gaps", self.phrase_sample_gaps));
        }

        if self.worker_threads == 0 {
            return Err(invalid("sync.worker_threads", self.worker_threads));
        }

        Ok(())
    }
}

/// Transition selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Shortest transition (seconds), used for high-energy boundaries
    pub min_duration: f64,

    /// Longest transition (seconds), used for low-energy boundaries
    pub max_duration: f64,

    /// Energy above which a boundary is treated as high energy
    pub high_energy_threshold: f32,

    /// Energy above which a boundary is treated as medium energy
    pub medium_energy_threshold: f32,

    /// Visual similarity above which a match cut is forced
    pub similarity_threshold: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            min_duration: 0.2,
            max_duration: 1.0,
            high_energy_threshold: 0.7,
            medium_energy_threshold: 0.4,
            similarity_threshold: 0.8,
        }
    }
}

impl TransitionConfig {
    /// Midpoint of the allowed duration range
    pub fn mid_duration(&self) -> f64 {
        (self.min_duration + self.max_duration) / 2.0
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_duration > 0.0) || self.max_duration < self.min_duration {
            return Err(invalid(
                "transitions.duration_range",
                format!("{}-{}", self.min_duration, self.max_duration),
            ));
        }

        if !(0.0..=1.0).contains(&self.medium_energy_threshold)
            || !(0.0..=1.0).contains(&self.high_energy_threshold)
            || self.medium_energy_threshold >= self.high_energy_threshold
        {
            return Err(invalid(
                "transitions.energy_thresholds",
                format!("{}/{}", self.medium_energy_threshold, self.high_energy_threshold),
            ));
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid("transitions.similarity_threshold", self.similarity_threshold));
        }

        Ok(())
    }
}

/// External renderer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_binary: String,

    /// Video codec passed to ffmpeg
    pub video_codec: String,

    /// Whether the renderer runs on another machine, in which case local
    /// media references will not resolve
    pub remote: bool,

    /// Directory for intermediate files (concat lists)
    pub work_dir: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            video_codec: "libx264".to_string(),
            remote: false,
            work_dir: None,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.ffmpeg_binary.trim().is_empty() {
            return Err(invalid("render.ffmpeg_binary", "<empty>"));
        }

        if self.video_codec.trim().is_empty() {
            return Err(invalid("render.video_codec", "<empty>"));
        }

        Ok(())
    }
}

/// Quality report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Duration mismatch (ms) above which a warning is raised
    pub duration_warning_ms: f64,

    /// Cap applied to the reported sync accuracy (ms)
    pub sync_tolerance_ms: f64,

    /// Score penalty per issue
    pub issue_penalty: f64,

    /// Estimated render cost per second of wall-clock render time (USD)
    pub cost_per_second: f64,

    /// Render time (seconds) above which the render is flagged as the bottleneck
    pub render_ceiling_seconds: f64,

    /// Timeout for fetching the rendered asset (seconds)
    pub fetch_timeout_seconds: u64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            duration_warning_ms: 500.0,
            sync_tolerance_ms: 50.0,
            issue_penalty: 10.0,
            cost_per_second: 0.002,
            render_ceiling_seconds: 300.0,
            fetch_timeout_seconds: 10,
        }
    }
}

impl QualityConfig {
    fn validate(&self) -> Result<()> {
        if self.duration_warning_ms < 0.0 {
            return Err(invalid("quality.duration_warning_ms", self.duration_warning_ms));
        }

        if self.sync_tolerance_ms < 0.0 {
            return Err(invalid("quality.sync_tolerance_ms", self.sync_tolerance_ms));
        }

        if self.issue_penalty < 0.0 {
            return Err(invalid("quality.issue_penalty", self.issue_penalty));
        }

        if self.cost_per_second < 0.0 {
            return Err(invalid("quality.cost_per_second", self.cost_per_second));
        }

        if !(self.render_ceiling_seconds > 0.0) {
            return Err(invalid("quality.render_ceiling_seconds", self.render_ceiling_seconds));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("beatcut.toml");

        let mut original_config = Config::default();
        original_config.sync.search_radius = 0.75;
        original_config.quality.cost_per_second = 0.01;

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(loaded_config.sync.search_radius, 0.75);
        assert_eq!(loaded_config.quality.cost_per_second, 0.01);
        assert_eq!(loaded_config.transitions.max_duration, 1.0);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(&file_path, "[transitions]\nmin_duration = 0.3\n").unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.transitions.min_duration, 0.3);
        assert_eq!(config.transitions.max_duration, 1.0);
        assert_eq!(config.sync.beats_per_phrase, 4);
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/definitely/not/here.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_transition_range() {
        let mut config = Config::default();
        config.transitions.min_duration = 1.5;
        config.transitions.max_duration = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_energy_thresholds() {
        let mut config = Config::default();
        config.transitions.medium_energy_threshold = 0.8;
        config.transitions.high_energy_threshold = 0.7;
        assert!(config.validate().is_err());
    }
}
