use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{AssemblyError, Result};

/// Cloneable cancellation handle shared between the caller, the pipeline and
/// the renderer
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail with [`AssemblyError::Cancelled`] if cancellation was requested
    pub fn checkpoint(&self, stage: &str) -> Result<()> {
        if self.is_cancelled() {
            tracing::warn!("Cancellation observed before {}", stage);
            return Err(AssemblyError::cancelled(stage));
        }
        Ok(())
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any token clone, so this only ends on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_checkpoint() {
        let token = CancellationToken::new();
        assert!(token.checkpoint("sync").is_ok());

        token.clone().cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.checkpoint("render"),
            Err(AssemblyError::Cancelled { stage }) if stage == "render"
        ));
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let token = CancellationToken::new();
        let waiter = token.clone();

        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancellation should wake the waiter")
            .unwrap();
    }
}
