use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How bad an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One classified finding in a quality report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub message: String,
}

impl QualityIssue {
    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }
}

/// Expected vs. actual output duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationMatch {
    pub expected: f64,
    pub actual: f64,
    pub diff_ms: f64,
}

/// Render timing and cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub render_seconds: f64,
    pub estimated_cost_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottleneck_phase: Option<String>,
}

/// Scored summary of an assembled render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// 0-100
    pub overall_score: f64,
    pub sync_accuracy_ms: f64,
    pub frames_dropped: bool,
    pub duration_match: DurationMatch,
    pub issues: Vec<QualityIssue>,
    pub performance: Performance,
    pub generated_at: DateTime<Utc>,
}

impl QualityReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|issue| issue.severity == severity).count()
    }
}
