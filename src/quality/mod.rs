//! # Quality Module
//!
//! Scores a finished render: confirms the asset can be fetched, compares
//! its duration against the plan and estimates render cost.

pub mod fetch;
pub mod types;
pub mod validator;

pub use fetch::{AssetFetcher, DefaultAssetFetcher};
pub use types::{DurationMatch, Performance, QualityIssue, QualityReport, Severity};
pub use validator::{overall_score, QualityValidator, RENDER_BOTTLENECK};
