use std::time::Duration;

use async_trait::async_trait;

use crate::render::media::{classify, MediaRefKind};

/// Resolves a rendered asset reference to confirm it can be fetched
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// `Ok(())` when the asset is reachable, otherwise a human-readable reason
    async fn fetch(&self, asset_ref: &str) -> Result<(), String>;
}

/// Checks local files on disk and remote URLs with a HEAD request
pub struct DefaultAssetFetcher {
    client: reqwest::Client,
}

impl DefaultAssetFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }
}

impl Default for DefaultAssetFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

#[async_trait]
impl AssetFetcher for DefaultAssetFetcher {
    async fn fetch(&self, asset_ref: &str) -> Result<(), String> {
        match classify(asset_ref) {
            MediaRefKind::Remote => {
                let response = self
                    .client
                    .head(asset_ref)
                    .send()
                    .await
                    .map_err(|e| e.to_string())?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(format!("HTTP {}", response.status()))
                }
            }
            MediaRefKind::Local(path) => {
                let metadata = tokio::fs::metadata(&path).await.map_err(|e| e.to_string())?;
                if !metadata.is_file() {
                    return Err(format!("{} is not a file", path.display()));
                }
                if metadata.len() == 0 {
                    return Err(format!("{} is empty", path.display()));
                }
                Ok(())
            }
            MediaRefKind::Blob => Err("blob URLs cannot be fetched outside the browser".to_string()),
            MediaRefKind::DataUri => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_files() {
        let dir = tempdir().unwrap();
        let full = dir.path().join("out.mp4");
        let empty = dir.path().join("empty.mp4");
        std::fs::write(&full, b"not really a video").unwrap();
        std::fs::write(&empty, b"").unwrap();

        let fetcher = DefaultAssetFetcher::default();
        assert!(fetcher.fetch(&full.display().to_string()).await.is_ok());
        assert!(fetcher.fetch(&format!("file://{}", full.display())).await.is_ok());
        assert!(fetcher.fetch(&empty.display().to_string()).await.is_err());
        assert!(fetcher.fetch(&dir.path().join("missing.mp4").display().to_string()).await.is_err());
        assert!(fetcher.fetch(&dir.path().display().to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_blob_is_unfetchable() {
        let fetcher = DefaultAssetFetcher::default();
        assert!(fetcher.fetch("blob:https://app/1").await.is_err());
    }
}
