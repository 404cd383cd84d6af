use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::{
    assembly::{CancellationToken, ProgressReporter},
    config::RenderConfig,
    error::{RenderError, Result},
    render::renderer::Renderer,
    render::types::{OutputFormat, RenderRequest, RenderedAsset},
};

const STDERR_TAIL_LINES: usize = 20;

/// Renderer that shells out to the ffmpeg CLI.
///
/// Items are joined with the concat demuxer. Transitions travel in the
/// request for renderers that support them; this one renders every boundary
/// as a cut.
pub struct FfmpegRenderer {
    config: RenderConfig,
}

impl FfmpegRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    fn work_dir(&self) -> PathBuf {
        match &self.config.work_dir {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join(format!("beatcut_{}", std::process::id())),
        }
    }

    fn output_path(&self, request: &RenderRequest, work_dir: &Path) -> PathBuf {
        match &request.output_ref {
            Some(output) => PathBuf::from(local_path(output)),
            None => work_dir.join(format!("assembly.{}", request.format.extension())),
        }
    }

    fn codec(&self, format: OutputFormat) -> &str {
        match format {
            OutputFormat::Webm => "libvpx-vp9",
            _ => self.config.video_codec.as_str(),
        }
    }

    /// Write the concat demuxer script for the request
    pub fn write_concat_list(&self, request: &RenderRequest, work_dir: &Path) -> Result<PathBuf> {
        let list_path = work_dir.join("concat_list.txt");
        let mut file = File::create(&list_path)?;

        writeln!(file, "ffconcat version 1.0")?;
        for item in &request.items {
            writeln!(file, "file '{}'", escape_concat_path(&local_path(&item.media_ref)))?;
            if item.is_still {
                writeln!(file, "duration {:.6}", item.duration_seconds)?;
            } else {
                writeln!(file, "outpoint {:.6}", item.duration_seconds)?;
            }
        }

        // The concat demuxer ignores the duration of a trailing still
        if let Some(last) = request.items.last().filter(|item| item.is_still) {
            writeln!(file, "file '{}'", escape_concat_path(&local_path(&last.media_ref)))?;
        }

        debug!("Wrote concat list with {} items to {:?}", request.items.len(), list_path);
        Ok(list_path)
    }

    /// Command-line arguments for one render
    pub fn build_args(&self, request: &RenderRequest, list_path: &Path, output_path: &Path) -> Vec<String> {
        let (width, height) = (request.width, request.height);
        let filter = format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},format=yuv420p",
            w = width,
            h = height,
            fps = request.fps
        );

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-nostats".into(),
            "-progress".into(), "pipe:1".into(),
            "-protocol_whitelist".into(), "file,http,https,tcp,tls,crypto".into(),
            "-f".into(), "concat".into(),
            "-safe".into(), "0".into(),
            "-i".into(), list_path.display().to_string(),
        ];

        if let Some(audio) = &request.audio_ref {
            args.extend(["-i".into(), local_path(audio)]);
        }

        args.extend(["-map".into(), "0:v".into()]);
        if request.audio_ref.is_some() {
            args.extend(["-map".into(), "1:a?".into(), "-c:a".into(), audio_codec(request.format).into()]);
        }

        args.extend([
            "-vf".into(), filter,
            "-c:v".into(), self.codec(request.format).to_string(),
            "-r".into(), request.fps.to_string(),
            "-t".into(), format!("{:.3}", request.total_duration()),
            output_path.display().to_string(),
        ]);

        args
    }
}

#[async_trait]
impl Renderer for FfmpegRenderer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn reads_local_files(&self) -> bool {
        !self.config.remote
    }

    async fn check_available(&self) -> Result<()> {
        let status = Command::new(&self.config.ffmpeg_binary)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| RenderError::Unavailable {
                renderer: self.name().to_string(),
                reason: format!("{}: {}", self.config.ffmpeg_binary, e),
            })?;

        if !status.success() {
            return Err(RenderError::Unavailable {
                renderer: self.name().to_string(),
                reason: format!("{} -version exited with {}", self.config.ffmpeg_binary, status),
            }.into());
        }

        Ok(())
    }

    async fn render(
        &self,
        request: &RenderRequest,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<RenderedAsset> {
        if request.items.is_empty() {
            return Err(RenderError::InvalidRequest { details: "no items to render".to_string() }.into());
        }

        let work_dir = self.work_dir();
        tokio::fs::create_dir_all(&work_dir).await?;

        let list_path = self.write_concat_list(request, &work_dir)?;
        let output_path = self.output_path(request, &work_dir);
        let args = self.build_args(request, &list_path, &output_path);
        let total = request.total_duration();

        info!("Rendering {} items ({:.1}s) to {:?}", request.items.len(), total, output_path);
        debug!("{} {}", self.config.ffmpeg_binary, args.join(" "));

        let mut child = Command::new(&self.config.ffmpeg_binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RenderError::Unavailable {
                renderer: self.name().to_string(),
                reason: format!("failed to spawn {}: {}", self.config.ffmpeg_binary, e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| RenderError::Failed {
            message: "ffmpeg stdout was not captured".to_string(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| RenderError::Failed {
            message: "ffmpeg stderr was not captured".to_string(),
        })?;

        // Drain stderr concurrently so a chatty encoder cannot block on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>()
        });

        progress.report(0.0, "Rendering");

        let mut state = ProgressState::default();
        let mut lines = BufReader::new(stdout).lines();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!("Render cancelled, stopping ffmpeg");
                    let _ = child.kill().await;
                    return Err(RenderError::Cancelled.into());
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if state.apply(&line) && total > 0.0 {
                            progress.report(state.out_time_seconds / total, "Rendering");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Lost ffmpeg progress output: {}", e);
                        break;
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let status = match status {
            Some(status) => status?,
            None => {
                let _ = child.kill().await;
                return Err(RenderError::Cancelled.into());
            }
        };

        let stderr_tail = stderr_task.await.unwrap_or_default();
        if !state.finished {
            debug!("ffmpeg closed its progress stream before progress=end");
        }

        if !status.success() {
            let message = if stderr_tail.is_empty() {
                format!("ffmpeg exited with {}", status)
            } else {
                stderr_tail.join("\n")
            };
            return Err(RenderError::Failed { message }.into());
        }

        progress.report(1.0, "Rendering");

        let duration_seconds = if state.out_time_seconds > 0.0 { state.out_time_seconds } else { total };

        info!(
            "Render finished: {:.2}s, {} frames, {} dropped",
            duration_seconds,
            state.frame.unwrap_or(0),
            state.dropped_frames
        );

        Ok(RenderedAsset {
            asset_ref: output_path.display().to_string(),
            duration_seconds,
            frame_count: state.frame,
            dropped_frames: state.dropped_frames,
        })
    }
}

/// Accumulated `-progress` key/value output
#[derive(Debug, Default, Clone, PartialEq)]
struct ProgressState {
    out_time_seconds: f64,
    frame: Option<u64>,
    dropped_frames: u64,
    finished: bool,
}

impl ProgressState {
    /// Apply one `key=value` line; returns true when the output time advanced
    fn apply(&mut self, line: &str) -> bool {
        let Some((key, value)) = line.trim().split_once('=') else {
            return false;
        };

        match key {
            // ffmpeg reports microseconds under both names
            "out_time_us" | "out_time_ms" => match value.parse::<i64>() {
                Ok(micros) if micros >= 0 => {
                    let seconds = micros as f64 / 1_000_000.0;
                    let advanced = seconds > self.out_time_seconds;
                    self.out_time_seconds = self.out_time_seconds.max(seconds);
                    advanced
                }
                _ => false,
            },
            "frame" => {
                self.frame = value.parse().ok().or(self.frame);
                false
            }
            "drop_frames" => {
                self.dropped_frames = value.parse().unwrap_or(self.dropped_frames);
                false
            }
            "progress" => {
                self.finished = value == "end";
                false
            }
            _ => false,
        }
    }
}

fn local_path(reference: &str) -> String {
    reference.strip_prefix("file://").unwrap_or(reference).to_string()
}

fn escape_concat_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}

fn audio_codec(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Webm => "libopus",
        _ => "aac",
    }
}
