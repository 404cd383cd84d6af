use serde::{Deserialize, Serialize};

use crate::transitions::Transition;

/// Output resolution presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "480p")]
    Sd480,
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    FullHd1080,
    #[serde(rename = "4k")]
    Uhd4k,
}

impl Resolution {
    /// Landscape (width, height) for this preset
    pub fn landscape(&self) -> (u32, u32) {
        match self {
            Self::Sd480 => (854, 480),
            Self::Hd720 => (1280, 720),
            Self::FullHd1080 => (1920, 1080),
            Self::Uhd4k => (3840, 2160),
        }
    }
}

/// Frame aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Widescreen,
    #[serde(rename = "9:16")]
    Vertical,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Standard,
}

/// Container format of the rendered file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Mov,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }
}

/// Export options chosen by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub resolution: Resolution,
    pub aspect_ratio: AspectRatio,
    pub fps: f64,
    pub format: OutputFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            aspect_ratio: AspectRatio::default(),
            fps: 30.0,
            format: OutputFormat::default(),
        }
    }
}

impl ExportOptions {
    /// Pixel dimensions, always even so yuv420p encoders accept them
    pub fn dimensions(&self) -> (u32, u32) {
        let (width, height) = self.resolution.landscape();
        let (width, height) = match self.aspect_ratio {
            AspectRatio::Widescreen => (width, height),
            AspectRatio::Vertical => (height, width),
            AspectRatio::Square => (height, height),
            AspectRatio::Standard => (((height as f64) * 4.0 / 3.0).round() as u32, height),
        };
        (width & !1, height & !1)
    }
}

/// One entry of the render timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderItem {
    pub shot_id: String,

    /// Still image or clip reference
    pub media_ref: String,

    pub is_still: bool,

    pub duration_seconds: f64,

    pub label: String,

    /// Transition into the next item, if any
    pub transition_out: Option<Transition>,
}

/// Everything the external renderer needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub items: Vec<RenderItem>,
    pub audio_ref: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub format: OutputFormat,

    /// Destination requested by the caller; the renderer may choose one
    pub output_ref: Option<String>,
}

impl RenderRequest {
    pub fn total_duration(&self) -> f64 {
        self.items.iter().map(|item| item.duration_seconds).sum()
    }

    pub fn expected_frames(&self) -> u64 {
        (self.total_duration() * self.fps).round() as u64
    }
}

/// What the renderer hands back on success
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedAsset {
    pub asset_ref: String,

    /// Duration of the rendered output in seconds
    pub duration_seconds: f64,

    pub frame_count: Option<u64>,

    pub dropped_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_follow_aspect_ratio() {
        let mut options = ExportOptions::default();
        assert_eq!(options.dimensions(), (1920, 1080));

        options.aspect_ratio = AspectRatio::Vertical;
        assert_eq!(options.dimensions(), (1080, 1920));

        options.resolution = Resolution::Hd720;
        options.aspect_ratio = AspectRatio::Square;
        assert_eq!(options.dimensions(), (720, 720));

        options.resolution = Resolution::Sd480;
        options.aspect_ratio = AspectRatio::Standard;
        assert_eq!(options.dimensions(), (640, 480));
    }

    #[test]
    fn test_export_options_from_json() {
        let options: ExportOptions =
            serde_json::from_str(r#"{"resolution": "4k", "aspectRatio": "9:16"}"#).unwrap();
        assert_eq!(options.resolution, Resolution::Uhd4k);
        assert_eq!(options.dimensions(), (2160, 3840));
        assert_eq!(options.fps, 30.0);
        assert_eq!(options.format, OutputFormat::Mp4);
    }
}
