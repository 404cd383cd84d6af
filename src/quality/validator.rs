use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::QualityConfig;
use crate::quality::fetch::{AssetFetcher, DefaultAssetFetcher};
use crate::quality::types::{DurationMatch, Performance, QualityIssue, QualityReport};
use crate::render::RenderedAsset;

/// Label used when the render dominates the run time
pub const RENDER_BOTTLENECK: &str = "render";

/// `clamp(100 - penalty * issues - diff_ms / 100, 0, 100)`
pub fn overall_score(issue_count: usize, duration_diff_ms: f64, issue_penalty: f64) -> f64 {
    let diff = if duration_diff_ms.is_finite() { duration_diff_ms.max(0.0) } else { f64::MAX };
    (100.0 - issue_penalty * issue_count as f64 - diff / 100.0).clamp(0.0, 100.0)
}

/// Scores a finished render. Never fails; problems become report issues.
pub struct QualityValidator<F: AssetFetcher = DefaultAssetFetcher> {
    config: QualityConfig,
    fetcher: F,
}

impl QualityValidator<DefaultAssetFetcher> {
    pub fn new(config: QualityConfig) -> Self {
        let fetcher = DefaultAssetFetcher::new(Duration::from_secs(config.fetch_timeout_seconds));
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: AssetFetcher> QualityValidator<F> {
    pub fn with_fetcher(config: QualityConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    /// Validate a render against the expected duration
    pub async fn validate(
        &self,
        asset: &RenderedAsset,
        expected_duration: f64,
        audio_ref: Option<&str>,
        render_wall_clock_ms: u64,
    ) -> QualityReport {
        self.validate_with(asset, expected_duration, audio_ref, render_wall_clock_ms, Vec::new())
            .await
    }

    /// Like [`validate`](Self::validate), scoring `carried` issues from earlier
    /// stages alongside the ones found here
    pub async fn validate_with(
        &self,
        asset: &RenderedAsset,
        expected_duration: f64,
        audio_ref: Option<&str>,
        render_wall_clock_ms: u64,
        carried: Vec<QualityIssue>,
    ) -> QualityReport {
        info!("Validating render '{}'", asset.asset_ref);

        let mut issues = carried;

        if let Err(reason) = self.fetcher.fetch(&asset.asset_ref).await {
            warn!("Rendered asset could not be fetched: {}", reason);
            issues.push(QualityIssue::error(format!(
                "Rendered asset '{}' could not be fetched: {}",
                asset.asset_ref, reason
            )));
        }

        let actual = asset.duration_seconds;
        let diff_ms = (actual - expected_duration).abs() * 1000.0;
        if diff_ms > self.config.duration_warning_ms {
            issues.push(QualityIssue::warning(format!(
                "Duration mismatch: expected {:.2}s, rendered {:.2}s ({:.0}ms off)",
                expected_duration, actual, diff_ms
            )));
        }

        let frames_dropped = asset.dropped_frames > 0;
        if frames_dropped {
            issues.push(QualityIssue::warning(format!(
                "Renderer dropped {} frames",
                asset.dropped_frames
            )));
        }

        match audio_ref {
            Some(audio) if !audio.trim().is_empty() => debug!("Audio track: {}", audio),
            _ => debug!("Render has no audio track"),
        }

        let render_seconds = render_wall_clock_ms as f64 / 1000.0;
        let bottleneck_phase = (render_seconds > self.config.render_ceiling_seconds)
            .then(|| RENDER_BOTTLENECK.to_string());

        let report = QualityReport {
            overall_score: overall_score(issues.len(), diff_ms, self.config.issue_penalty),
            sync_accuracy_ms: diff_ms.min(self.config.sync_tolerance_ms),
            frames_dropped,
            duration_match: DurationMatch { expected: expected_duration, actual, diff_ms },
            issues,
            performance: Performance {
                render_seconds,
                estimated_cost_usd: render_seconds * self.config.cost_per_second,
                bottleneck_phase,
            },
            generated_at: Utc::now(),
        };

        info!(
            "Quality score {:.1} ({} issues, duration off by {:.0}ms)",
            report.overall_score,
            report.issues.len(),
            diff_ms
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::types::Severity;
    use async_trait::async_trait;

    struct StubFetcher {
        reachable: bool,
    }

    #[async_trait]
    impl AssetFetcher for StubFetcher {
        async fn fetch(&self, _asset_ref: &str) -> Result<(), String> {
            if self.reachable { Ok(()) } else { Err("404".to_string()) }
        }
    }

    fn validator(reachable: bool) -> QualityValidator<StubFetcher> {
        QualityValidator::with_fetcher(QualityConfig::default(), StubFetcher { reachable })
    }

    fn asset(duration: f64) -> RenderedAsset {
        RenderedAsset {
            asset_ref: "https://cdn.example.com/out.mp4".to_string(),
            duration_seconds: duration,
            frame_count: None,
            dropped_frames: 0,
        }
    }

    #[tokio::test]
    async fn test_clean_render_scores_high() {
        let report = validator(true).validate(&asset(30.1), 30.0, Some("track.mp3"), 12_000).await;

        assert!(report.issues.is_empty());
        assert!((report.duration_match.diff_ms - 100.0).abs() < 1e-6);
        assert!((report.overall_score - 99.0).abs() < 1e-6);
        assert!((report.sync_accuracy_ms - 50.0).abs() < 1e-6);
        assert!(!report.frames_dropped);
        assert!((report.performance.render_seconds - 12.0).abs() < 1e-9);
        assert!((report.performance.estimated_cost_usd - 0.024).abs() < 1e-9);
        assert!(report.performance.bottleneck_phase.is_none());
    }

    #[tokio::test]
    async fn test_unfetchable_asset_still_returns_report() {
        let report = validator(false).validate(&asset(30.0), 30.0, None, 1_000).await;

        assert_eq!(report.count(Severity::Error), 1);
        assert!(report.has_errors());
        assert_eq!(report.overall_score, 90.0);
    }

    #[tokio::test]
    async fn test_duration_mismatch_warns() {
        let report = validator(true).validate(&asset(31.0), 30.0, None, 1_000).await;

        assert_eq!(report.count(Severity::Warning), 1);
        assert!((report.duration_match.diff_ms - 1000.0).abs() < 1e-6);
        assert!((report.overall_score - 80.0).abs() < 1e-6);
        assert_eq!(report.sync_accuracy_ms, 50.0);

        let report = validator(true).validate(&asset(30.4), 30.0, None, 1_000).await;
        assert!(report.issues.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_frames_and_bottleneck() {
        let mut rendered = asset(30.0);
        rendered.dropped_frames = 4;
        let report = validator(true).validate(&rendered, 30.0, None, 301_000).await;

        assert!(report.frames_dropped);
        assert_eq!(report.performance.bottleneck_phase.as_deref(), Some(RENDER_BOTTLENECK));
    }

    #[tokio::test]
    async fn test_carried_issues_count_toward_score() {
        let carried = vec![QualityIssue::warning("blob reference")];
        let report = validator(true)
            .validate_with(&asset(30.0), 30.0, None, 1_000, carried)
            .await;
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.overall_score, 90.0);
    }

    #[test]
    fn test_score_is_monotonic() {
        let mut previous = f64::MAX;
        for issues in 0..15 {
            let score = overall_score(issues, 250.0, 10.0);
            assert!(score <= previous);
            assert!((0.0..=100.0).contains(&score));
            previous = score;
        }

        let mut previous = f64::MAX;
        for step in 0..200 {
            let score = overall_score(2, step as f64 * 75.0, 10.0);
            assert!(score <= previous);
            previous = score;
        }
        assert_eq!(overall_score(20, 0.0, 10.0), 0.0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = QualityReport {
            overall_score: 90.0,
            sync_accuracy_ms: 10.0,
            frames_dropped: false,
            duration_match: DurationMatch { expected: 1.0, actual: 1.01, diff_ms: 10.0 },
            issues: vec![QualityIssue::warning("x")],
            performance: Performance { render_seconds: 1.0, estimated_cost_usd: 0.002, bottleneck_phase: None },
            generated_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["overallScore"], 90.0);
        assert_eq!(json["durationMatch"]["diffMs"], 10.0);
        assert_eq!(json["issues"][0]["severity"], "warning");
        assert!(json["performance"].get("bottleneckPhase").is_none());
    }
}
