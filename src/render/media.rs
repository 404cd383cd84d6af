use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::timeline::Shot;

/// Where a media reference points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRefKind {
    /// http(s) URL reachable from anywhere
    Remote,
    /// Browser object URL, gone once the page that created it unloads
    Blob,
    /// Inline data URI
    DataUri,
    /// File on this machine
    Local(PathBuf),
}

/// Classify a media reference by its scheme
pub fn classify(reference: &str) -> MediaRefKind {
    let trimmed = reference.trim();
    let lower = trimmed.to_ascii_lowercase();

    if lower.starts_with("http://") || lower.starts_with("https://") {
        MediaRefKind::Remote
    } else if lower.starts_with("blob:") {
        MediaRefKind::Blob
    } else if lower.starts_with("data:") {
        MediaRefKind::DataUri
    } else {
        let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
        MediaRefKind::Local(PathBuf::from(path))
    }
}

/// A non-fatal media problem found before rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaWarning {
    pub shot_id: String,
    pub message: String,
}

/// Check every shot's media reference ahead of the render.
///
/// Never fails: each problem becomes a [`MediaWarning`].
pub fn prepare_media<'a, I>(shots: I, target: (u32, u32), reads_local_files: bool) -> Vec<MediaWarning>
where
    I: IntoIterator<Item = &'a Shot>,
{
    let mut warnings = Vec::new();

    for shot in shots {
        let Some(reference) = shot.media.primary_ref() else {
            continue;
        };

        let mut push = |message: String| {
            warn!("Shot '{}': {}", shot.id, message);
            warnings.push(MediaWarning { shot_id: shot.id.clone(), message });
        };

        match classify(reference) {
            MediaRefKind::Remote | MediaRefKind::DataUri => {}
            MediaRefKind::Blob => push(format!(
                "media reference '{}' is an ephemeral blob URL and will not survive a remote render",
                reference
            )),
            MediaRefKind::Local(path) if !reads_local_files => push(format!(
                "local media '{}' is not reachable from the remote renderer",
                path.display()
            )),
            MediaRefKind::Local(path) if !path.exists() => push(format!(
                "local media '{}' does not exist",
                path.display()
            )),
            MediaRefKind::Local(path) if shot.media.is_still() => {
                match image::image_dimensions(&path) {
                    Ok((width, height)) => {
                        debug!("Still for '{}' is {}x{}", shot.id, width, height);
                        if width < target.0 && height < target.1 {
                            push(format!(
                                "still image is {}x{}, below the {}x{} output and will be upscaled",
                                width, height, target.0, target.1
                            ));
                        }
                    }
                    Err(e) => push(format!("still image '{}' could not be read: {}", path.display(), e)),
                }
            }
            MediaRefKind::Local(_) => {}
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::ShotMedia;
    use image::{ImageBuffer, Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_classify() {
        assert_eq!(classify("https://cdn.example.com/a.png"), MediaRefKind::Remote);
        assert_eq!(classify("blob:https://app/123"), MediaRefKind::Blob);
        assert_eq!(classify("data:image/png;base64,AAAA"), MediaRefKind::DataUri);
        assert_eq!(classify("file:///tmp/a.png"), MediaRefKind::Local(PathBuf::from("/tmp/a.png")));
        assert_eq!(classify("renders/a.mp4"), MediaRefKind::Local(PathBuf::from("renders/a.mp4")));
    }

    #[test]
    fn test_blob_and_remote_local_refs_warn() {
        let shots = vec![
            Shot::new("blob", 0.0, 1.0, "wide").with_media(ShotMedia::clip("blob:https://app/1")),
            Shot::new("remote", 1.0, 2.0, "wide").with_media(ShotMedia::clip("https://cdn/x.mp4")),
            Shot::new("local", 2.0, 3.0, "wide").with_media(ShotMedia::clip("/tmp/x.mp4")),
        ];

        let warnings = prepare_media(&shots, (1920, 1080), false);
        let ids: Vec<&str> = warnings.iter().map(|w| w.shot_id.as_str()).collect();
        assert_eq!(ids, vec!["blob", "local"]);
    }

    #[test]
    fn test_missing_local_file_warns() {
        let shots = vec![
            Shot::new("s1", 0.0, 1.0, "wide").with_media(ShotMedia::still("/definitely/missing.png")),
        ];
        let warnings = prepare_media(&shots, (1920, 1080), true);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("does not exist"));
    }

    #[test]
    fn test_low_resolution_still_warns() {
        let dir = tempdir().unwrap();
        let small = dir.path().join("small.png");
        let large = dir.path().join("large.png");
        let small_img: RgbImage = ImageBuffer::from_pixel(320, 180, Rgb([10, 20, 30]));
        let large_img: RgbImage = ImageBuffer::from_pixel(1280, 720, Rgb([10, 20, 30]));
        small_img.save(&small).unwrap();
        large_img.save(&large).unwrap();

        let shots = vec![
            Shot::new("small", 0.0, 1.0, "wide")
                .with_media(ShotMedia::still(small.display().to_string())),
            Shot::new("large", 1.0, 2.0, "wide")
                .with_media(ShotMedia::still(large.display().to_string())),
        ];

        let warnings = prepare_media(&shots, (1280, 720), true);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].shot_id, "small");
        assert!(warnings[0].message.contains("320x180"));
    }
}
