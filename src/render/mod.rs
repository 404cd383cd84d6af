//! # Render Module
//!
//! The boundary to the external renderer: request types, the [`Renderer`]
//! trait, an ffmpeg-backed implementation and pre-render media checks.

pub mod ffmpeg;
pub mod media;
pub mod renderer;
pub mod types;

pub use ffmpeg::FfmpegRenderer;
pub use media::{classify, prepare_media, MediaRefKind, MediaWarning};
pub use renderer::Renderer;
pub use types::{
    AspectRatio, ExportOptions, OutputFormat, RenderItem, RenderRequest, RenderedAsset, Resolution,
};
