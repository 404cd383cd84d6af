//! # beatcut
//!
//! Assemble generated clips into a music-synchronized video track.
//!
//! Shots from an upstream shot list are snapped to beats from an upstream
//! tempo detector, joined with energy-driven transitions, handed to an
//! external renderer and scored once the render comes back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beatcut::{
//!     assembly::{AssemblyInput, AssemblyOrchestrator, CancellationToken, ProgressReporter},
//!     config::Config,
//!     render::FfmpegRenderer,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let renderer = FfmpegRenderer::new(config.render.clone());
//! let orchestrator = AssemblyOrchestrator::new(config, Box::new(renderer));
//!
//! let input: AssemblyInput = serde_json::from_str(&std::fs::read_to_string("shots.json")?)?;
//! let (progress, _updates) = ProgressReporter::channel();
//! let outcome = orchestrator
//!     .assemble(&input, &progress, &CancellationToken::new())
//!     .await?;
//!
//! println!("score: {:.1}", outcome.report.overall_score);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`timeline`] - Beat synchronization and phrase detection
//! - [`transitions`] - Energy-driven transition selection
//! - [`render`] - Render request types, the [`Renderer`](render::Renderer) trait and ffmpeg backend
//! - [`assembly`] - The end-to-end pipeline
//! - [`quality`] - Post-render scoring
//! - [`config`] - Configuration management
//!
//! ## Custom Renderers
//!
//! Any backend can drive the render stage by implementing
//! [`Renderer`](render::Renderer):
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use beatcut::assembly::{CancellationToken, ProgressReporter};
//! use beatcut::error::Result;
//! use beatcut::render::{RenderRequest, RenderedAsset, Renderer};
//!
//! struct CloudRenderer;
//!
//! #[async_trait]
//! impl Renderer for CloudRenderer {
//!     fn name(&self) -> &str {
//!         "cloud"
//!     }
//!
//!     fn reads_local_files(&self) -> bool {
//!         false
//!     }
//!
//!     async fn render(
//!         &self,
//!         request: &RenderRequest,
//!         progress: &ProgressReporter,
//!         cancel: &CancellationToken,
//!     ) -> Result<RenderedAsset> {
//!         cancel.checkpoint("upload")?;
//!         progress.report(1.0, "Rendering");
//!         Ok(RenderedAsset {
//!             asset_ref: "https://cdn.example.com/out.mp4".to_string(),
//!             duration_seconds: request.total_duration(),
//!             frame_count: None,
//!             dropped_frames: 0,
//!         })
//!     }
//! }
//! ```

pub mod assembly;
pub mod config;
pub mod error;
pub mod quality;
pub mod render;
pub mod timeline;
pub mod transitions;

// Re-export commonly used types for convenience
pub use crate::{
    assembly::{AssemblyInput, AssemblyOrchestrator, AssemblyOutcome, AssemblyPlan},
    config::Config,
    error::{AssemblyError, Result},
    quality::QualityReport,
    render::Renderer,
};
