use async_trait::async_trait;

use crate::{
    assembly::{CancellationToken, ProgressReporter},
    error::Result,
    render::types::{RenderRequest, RenderedAsset},
};

/// The external collaborator that turns a render request into a video.
///
/// Implementations report their own `0..1` progress through `progress`; the
/// pipeline has already narrowed it to the render band. They must stop work
/// and return [`RenderError::Cancelled`](crate::error::RenderError::Cancelled)
/// once `cancel` fires.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Returns the unique name of this renderer
    fn name(&self) -> &str;

    /// Whether local file references are reachable from the render host
    fn reads_local_files(&self) -> bool {
        true
    }

    /// Check the renderer can run at all before any work is queued
    async fn check_available(&self) -> Result<()> {
        Ok(())
    }

    /// Render the request and return a reference to the produced asset
    async fn render(
        &self,
        request: &RenderRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RenderedAsset>;
}
