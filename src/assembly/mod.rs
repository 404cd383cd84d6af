//! # Assembly Module
//!
//! The orchestrator that turns scenes and beats into a rendered, scored
//! video, plus the progress and cancellation plumbing it shares with the
//! renderer.

pub mod cancel;
pub mod engine;
pub mod progress;

pub use cancel::CancellationToken;
pub use engine::{
    validate_scenes, AssemblyInput, AssemblyOrchestrator, AssemblyOutcome, AssemblyPlan, AssemblyStats,
    SceneTransitions,
};
pub use progress::{ProgressReporter, ProgressUpdate};
