use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    assembly::{CancellationToken, ProgressReporter},
    config::Config,
    error::{AssemblyError, Result, SyncError, ValidationError},
    quality::{AssetFetcher, DefaultAssetFetcher, QualityIssue, QualityReport, QualityValidator},
    render::{prepare_media, ExportOptions, MediaWarning, RenderItem, RenderRequest, RenderedAsset, Renderer},
    timeline::{nearest_beat, Beat, BeatSynchronizer, Scene, Shot, SyncedClip},
    transitions::{Transition, TransitionSelector},
};

/// Everything one assembly run consumes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblyInput {
    pub scenes: Vec<Scene>,

    /// Beats in time order, from the upstream tempo detector
    pub beats: Vec<Beat>,

    pub export_options: ExportOptions,

    /// Opaque audio reference passed through to the renderer
    pub audio_ref: Option<String>,

    /// Where the caller wants the render written
    pub output_ref: Option<String>,
}

/// Transitions chosen inside one scene, one slot per shot.
/// The last shot of a scene never has one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneTransitions {
    pub scene_id: String,
    pub transitions: Vec<Option<Transition>>,
}

/// Counters logged at the end of planning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyStats {
    pub shots: usize,
    pub beat_aligned_edges: usize,
    pub phrase_extensions: usize,
    pub clamped_shots: usize,
    pub forced_match_cuts: usize,
}

/// The result of every stage up to (not including) the render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyPlan {
    pub synced_clips: BTreeMap<String, SyncedClip>,
    pub transitions: Vec<SceneTransitions>,
    pub media_warnings: Vec<MediaWarning>,
    pub render_request: RenderRequest,

    /// Last beat time, or the summed clip durations without beats
    pub expected_duration: f64,

    pub stats: AssemblyStats,
    pub generated_at: DateTime<Utc>,
}

/// A successful run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyOutcome {
    pub plan: AssemblyPlan,
    pub asset: RenderedAsset,
    pub report: QualityReport,
}

/// Reject shot lists the renderer could never honor
pub fn validate_scenes(scenes: &[Scene]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut total = 0;

    for shot in scenes.iter().flat_map(|scene| scene.shots.iter()) {
        total += 1;

        if shot.media.primary_ref().is_none() {
            return Err(ValidationError::MissingMedia { shot_id: shot.id.clone() }.into());
        }

        if !shot.start.is_finite() || !shot.end.is_finite() || shot.end <= shot.start {
            return Err(ValidationError::InvalidRange {
                shot_id: shot.id.clone(),
                start: shot.start,
                end: shot.end,
            }
            .into());
        }

        if let Some(flex) = &shot.duration_flexibility {
            if !flex.min.is_finite() || !flex.max.is_finite() || flex.min <= 0.0 || flex.min > flex.max {
                return Err(ValidationError::InvalidFlexibility {
                    shot_id: shot.id.clone(),
                    min: flex.min,
                    max: flex.max,
                }
                .into());
            }
        }

        if !seen.insert(shot.id.as_str()) {
            return Err(ValidationError::DuplicateShot { shot_id: shot.id.clone() }.into());
        }
    }

    if total == 0 {
        return Err(ValidationError::EmptyShotList.into());
    }

    Ok(())
}

/// Drives a shot list through sync, transitions, media checks, render and
/// quality scoring.
///
/// The pipeline is strictly linear:
/// 1. Validate - every shot has media and a sane range
/// 2. SyncAll - snap shots to beats on a worker pool
/// 3. DeriveTransitions - one transition per adjacent pair inside a scene
/// 4. PrepareMedia - flag media the renderer may not be able to use
/// 5. Render - hand the request to the [`Renderer`]
/// 6. ValidateQuality - score the result
pub struct AssemblyOrchestrator<F: AssetFetcher = DefaultAssetFetcher> {
    planner: Planner,
    renderer: Box<dyn Renderer>,
    validator: QualityValidator<F>,
}

/// The CPU-bound stages before the render. Cheap to clone so planning can
/// move onto the blocking pool; clones share the sync worker pool.
#[derive(Debug, Clone)]
struct Planner {
    config: Config,
    synchronizer: BeatSynchronizer,
    reads_local_files: bool,
    seed: Option<u64>,
}

impl Planner {
    fn new(config: Config, reads_local_files: bool) -> Self {
        let synchronizer = BeatSynchronizer::with_config(&config.sync);
        Self { config, synchronizer, reads_local_files, seed: None }
    }

    fn plan(
        &self,
        input: &AssemblyInput,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<AssemblyPlan> {
        let shot_count: usize = input.scenes.iter().map(|scene| scene.shots.len()).sum();
        info!("🎬 Planning assembly");
        info!("   Scenes: {}", input.scenes.len());
        info!("   Shots: {}", shot_count);
        info!("   Beats: {}", input.beats.len());

        // Stage 1: Validate. Nothing is reported until this passes.
        info!("🔎 Step 1: Validating shot list...");
        validate_scenes(&input.scenes)?;
        progress.report(0.05, "Validated shot list");

        // Stage 2: SyncAll
        cancel.checkpoint("synchronization")?;
        info!("🥁 Step 2: Synchronizing shots to beats...");
        let shots = input.scenes.iter().flat_map(|scene| scene.shots.iter());
        let synced_clips = self.synchronizer.sync_all(shots, &input.beats)?;
        progress.report(0.15, "Synchronized shots");

        // Stage 3: DeriveTransitions
        cancel.checkpoint("transitions")?;
        info!("✨ Step 3: Deriving transitions...");
        let transitions = self.derive_transitions(&input.scenes, &input.beats, &synced_clips)?;
        progress.report(0.25, "Derived transitions");

        // Stage 4: PrepareMedia
        cancel.checkpoint("media preparation")?;
        info!("🖼️  Step 4: Preparing media...");
        let (width, height) = input.export_options.dimensions();
        let media_warnings = prepare_media(
            input.scenes.iter().flat_map(|scene| scene.shots.iter()),
            (width, height),
            self.reads_local_files,
        );
        if !media_warnings.is_empty() {
            warn!("   {} media warnings", media_warnings.len());
        }
        progress.report(0.35, "Prepared media");

        let render_request = build_render_request(input, &synced_clips, &transitions, (width, height))?;
        let expected_duration = input
            .beats
            .last()
            .map(|beat| beat.time)
            .unwrap_or_else(|| render_request.total_duration());

        let stats = collect_stats(&synced_clips, &transitions);
        info!("📊 Assembly statistics:");
        info!("   Beat-aligned edges: {}", stats.beat_aligned_edges);
        info!("   Phrase extensions: {}", stats.phrase_extensions);
        info!("   Clamped shots: {}", stats.clamped_shots);
        info!("   Forced match cuts: {}", stats.forced_match_cuts);
        info!(
            "   Timeline: {} items, {:.2}s (expected {:.2}s)",
            render_request.items.len(),
            render_request.total_duration(),
            expected_duration
        );

        progress.report(0.4, "Render queued");

        Ok(AssemblyPlan {
            synced_clips,
            transitions,
            media_warnings,
            render_request,
            expected_duration,
            stats,
            generated_at: Utc::now(),
        })
    }

    fn derive_transitions(
        &self,
        scenes: &[Scene],
        beats: &[Beat],
        synced: &BTreeMap<String, SyncedClip>,
    ) -> Result<Vec<SceneTransitions>> {
        let mut selector = match self.seed {
            Some(seed) => TransitionSelector::seeded(self.config.transitions.clone(), seed),
            None => TransitionSelector::new(self.config.transitions.clone()),
        };

        let mut derived = Vec::with_capacity(scenes.len());
        for scene in scenes {
            let mut transitions = Vec::with_capacity(scene.shots.len());

            for pair in scene.shots.windows(2) {
                let (shot_a, shot_b) = (&pair[0], &pair[1]);
                let boundary = clip_for(synced, shot_a)?.synced_end;
                let energy = nearest_beat(beats, boundary, None).map_or(0.0, |beat| beat.energy);
                transitions.push(Some(selector.select(shot_a, shot_b, energy, boundary)));
            }
            if !scene.shots.is_empty() {
                transitions.push(None);
            }

            debug!("Scene '{}': {} transitions", scene.id, transitions.iter().flatten().count());
            derived.push(SceneTransitions { scene_id: scene.id.clone(), transitions });
        }

        Ok(derived)
    }
}

impl AssemblyOrchestrator<DefaultAssetFetcher> {
    pub fn new(config: Config, renderer: Box<dyn Renderer>) -> Self {
        let validator = QualityValidator::new(config.quality.clone());
        let planner = Planner::new(config, renderer.reads_local_files());
        Self { planner, renderer, validator }
    }
}

impl<F: AssetFetcher> AssemblyOrchestrator<F> {
    /// Use a custom fetcher to confirm rendered assets
    pub fn with_fetcher(config: Config, renderer: Box<dyn Renderer>, fetcher: F) -> Self {
        let validator = QualityValidator::with_fetcher(config.quality.clone(), fetcher);
        let planner = Planner::new(config, renderer.reads_local_files());
        Self { planner, renderer, validator }
    }

    /// Fix the transition RNG seed so runs are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.planner.seed = Some(seed);
        self
    }

    pub fn renderer_name(&self) -> &str {
        self.renderer.name()
    }

    /// Run every stage before the render and return the result.
    ///
    /// Blocks while shots are synchronized and stills are probed; async
    /// callers should prefer [`assemble`](Self::assemble).
    pub fn plan(
        &self,
        input: &AssemblyInput,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<AssemblyPlan> {
        self.planner.plan(input, progress, cancel)
    }

    /// Run the whole pipeline
    pub async fn assemble(
        &self,
        input: &AssemblyInput,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<AssemblyOutcome> {
        let planner = self.planner.clone();
        let (owned_input, plan_progress, plan_cancel) = (input.clone(), progress.clone(), cancel.clone());
        let plan = tokio::task::spawn_blocking(move || planner.plan(&owned_input, &plan_progress, &plan_cancel))
            .await
            .map_err(|e| AssemblyError::generic(format!("planning task failed: {}", e)))??;

        // Stage 5: Render
        cancel.checkpoint("render")?;
        info!("🎞️  Step 5: Rendering with '{}'...", self.renderer.name());
        self.renderer.check_available().await?;

        let started = Instant::now();
        let asset = self
            .renderer
            .render(&plan.render_request, &progress.band(0.4, 0.8), cancel)
            .await?;
        let render_wall_clock_ms = started.elapsed().as_millis() as u64;
        info!(
            "   Rendered '{}' ({:.2}s) in {:.1}s",
            asset.asset_ref,
            asset.duration_seconds,
            render_wall_clock_ms as f64 / 1000.0
        );
        progress.report(0.8, "Rendered");

        // Stage 6: ValidateQuality
        cancel.checkpoint("quality validation")?;
        info!("✅ Step 6: Validating quality...");
        progress.report(0.9, "Checking quality");

        let carried = plan
            .media_warnings
            .iter()
            .map(|w| QualityIssue::warning(format!("Shot '{}': {}", w.shot_id, w.message)))
            .collect();
        let report = self
            .validator
            .validate_with(
                &asset,
                plan.expected_duration,
                input.audio_ref.as_deref(),
                render_wall_clock_ms,
                carried,
            )
            .await;

        progress.report(1.0, "Done");
        info!("🎉 Assembly complete! Score {:.1}", report.overall_score);

        Ok(AssemblyOutcome { plan, asset, report })
    }

}

fn clip_for<'a>(synced: &'a BTreeMap<String, SyncedClip>, shot: &Shot) -> Result<&'a SyncedClip> {
    synced
        .get(&shot.id)
        .ok_or_else(|| SyncError::MissingClip { shot_id: shot.id.clone() }.into())
}

fn build_render_request(
    input: &AssemblyInput,
    synced: &BTreeMap<String, SyncedClip>,
    transitions: &[SceneTransitions],
    (width, height): (u32, u32),
) -> Result<RenderRequest> {
    let mut timed = Vec::new();

    for (scene, scene_transitions) in input.scenes.iter().zip(transitions) {
        for (idx, (shot, transition)) in scene.shots.iter().zip(&scene_transitions.transitions).enumerate() {
            let clip = clip_for(synced, shot)?;
            // Validation guarantees a reference
            let media_ref = shot.media.primary_ref().unwrap_or_default().to_string();
            let leads_into = scene.shots.get(idx + 1).map(|next| next.id.as_str());
            timed.push((
                shot.start,
                leads_into,
                RenderItem {
                    shot_id: shot.id.clone(),
                    media_ref,
                    is_still: shot.media.is_still(),
                    duration_seconds: clip.duration(),
                    label: shot.label(),
                    transition_out: transition.clone(),
                },
            ));
        }
    }

    timed.sort_by(|a, b| a.0.total_cmp(&b.0));

    // A transition only survives when its target directly follows on the timeline
    let next_ids: Vec<Option<String>> = timed
        .iter()
        .skip(1)
        .map(|(_, _, item)| Some(item.shot_id.clone()))
        .chain(std::iter::once(None))
        .collect();
    for ((_, leads_into, item), next_id) in timed.iter_mut().zip(next_ids) {
        if item.transition_out.is_some() && *leads_into != next_id.as_deref() {
            warn!(
                "Dropping transition out of '{}': '{}' does not follow it on the timeline",
                item.shot_id,
                leads_into.unwrap_or_default()
            );
            item.transition_out = None;
        }
    }

    Ok(RenderRequest {
        items: timed.into_iter().map(|(_, _, item)| item).collect(),
        audio_ref: input.audio_ref.clone(),
        width,
        height,
        fps: input.export_options.fps,
        format: input.export_options.format,
        output_ref: input.output_ref.clone(),
    })
}

fn collect_stats(synced: &BTreeMap<String, SyncedClip>, transitions: &[SceneTransitions]) -> AssemblyStats {
    AssemblyStats {
        shots: synced.len(),
        beat_aligned_edges: synced.values().map(|clip| clip.aligned_beats.len()).sum(),
        phrase_extensions: synced.values().filter(|clip| clip.phrase_extended).count(),
        clamped_shots: synced.values().filter(|clip| clip.duration_clamped).count(),
        forced_match_cuts: transitions
            .iter()
            .flat_map(|scene| scene.transitions.iter().flatten())
            .filter(|transition| transition.similarity_override)
            .count(),
    }
}
