//! FFmpeg execution adapter
//!
//! Runs the external `ffmpeg` binary as a child process. Progress comes from
//! `-progress pipe:1` on stdout; stderr is kept for error reporting.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::domain::errors::*;
use crate::ports::*;

/// Number of stderr lines kept for error messages
const STDERR_TAIL: usize = 20;

/// Name of the GIF inside the per-job scratch directory
const OUTPUT_NAME: &str = "output.gif";

/// FFmpeg-based transcoding engine
pub struct FFmpegEngine {
    ffmpeg_path: PathBuf,
    loaded: AtomicBool,
}

impl FFmpegEngine {
    /// Create new FFmpeg engine; nothing is executed until `load`
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg_path
    }

    async fn check_binary(&self) -> Result<String, String> {
        let output = Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| format!("{}: {}", self.ffmpeg_path.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "{} -version exited with {}",
                self.ffmpeg_path.display(),
                output.status
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or("ffmpeg").to_string())
    }
}

/// Build the single filter graph: crop, scale, resample, then a per-frame palette
pub fn filter_graph(request: &TranscodeRequest) -> String {
    format!(
        "crop={size}:{size}:{x}:{y},scale={out}:{out}:flags=lanczos,fps={fps},split[s0][s1];\
         [s0]palettegen=stats_mode=single:max_colors=64[p];\
         [s1][p]paletteuse=dither=bayer:bayer_scale=3:new=1",
        size = request.crop_size,
        x = request.crop_x,
        y = request.crop_y,
        out = request.output_size,
        fps = request.fps,
    )
}

/// Build the full ffmpeg argument list
pub fn build_args(request: &TranscodeRequest, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-nostats".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-i".to_string(),
        request.source.to_string_lossy().to_string(),
        "-ss".to_string(),
        format!("{}", request.start_time_seconds),
        "-t".to_string(),
        format!("{}", request.duration_seconds),
        "-vf".to_string(),
        filter_graph(request),
        "-an".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Turn one `-progress` line into a signal
pub fn parse_progress_line(line: &str, duration_seconds: f64) -> Option<EngineSignal> {
    let line = line.trim();
    if let Some(value) = line.strip_prefix("out_time_us=") {
        let micros: f64 = value.parse().ok()?;
        if duration_seconds <= 0.0 {
            return None;
        }
        return Some(EngineSignal::Fraction(micros / (duration_seconds * 1_000_000.0)));
    }
    if line.starts_with("frame=") {
        return Some(EngineSignal::Log(line.to_string()));
    }
    None
}

/// Error text for a failed run: the first line naming the cause, then the closing line.
///
/// FFmpeg usually ends with a generic "Conversion failed!" after the real error.
pub fn failure_message(tail: &VecDeque<String>) -> Option<String> {
    let last = tail.back()?.trim();
    let cause = tail.iter().take(tail.len() - 1).map(|line| line.trim()).find(|line| {
        let lower = line.to_ascii_lowercase();
        lower.contains("error") || lower.contains("invalid") || lower.contains("no such file")
    });
    Some(match cause {
        Some(cause) => format!("{}: {}", last.trim_end_matches('!'), cause),
        None => last.to_string(),
    })
}

#[async_trait]
impl TranscodePort for FFmpegEngine {
    async fn load(&self) -> Result<(), DomainError> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        let version = self
            .check_binary()
            .await
            .map_err(|reason| DomainError::EngineLoadFailure(format!("Failed to load FFmpeg: {}", reason)))?;

        info!("Loaded {}", version);
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    async fn transcode(
        &self,
        request: &TranscodeRequest,
        signals: UnboundedSender<EngineSignal>,
    ) -> Result<Vec<u8>, DomainError> {
        let scratch = tempfile::Builder::new()
            .prefix("gifcrop-")
            .tempdir()
            .map_err(|e| DomainError::FsFailure(format!("Failed to create scratch directory: {}", e)))?;
        let output_path = scratch.path().join(OUTPUT_NAME);
        let args = build_args(request, &output_path);
        debug!("Running {} {}", self.ffmpeg_path.display(), args.join(" "));

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DomainError::EngineExecutionFailure(format!("Failed to start FFmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DomainError::EngineExecutionFailure("Failed to capture FFmpeg progress".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| DomainError::EngineExecutionFailure("Failed to capture FFmpeg output".to_string()))?;

        let duration = request.duration_seconds;
        let progress = async {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(signal) = parse_progress_line(&line, duration) {
                    let _ = signals.send(signal);
                }
            }
        };
        let diagnostics = async {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(target: "ffmpeg", "{}", line);
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        };

        let (_, tail, status) = tokio::join!(progress, diagnostics, child.wait());
        let status =
            status.map_err(|e| DomainError::EngineExecutionFailure(format!("FFmpeg process failed: {}", e)))?;

        if !status.success() {
            let message = failure_message(&tail).unwrap_or_else(|| format!("FFmpeg exited with {}", status));
            return Err(DomainError::EngineExecutionFailure(message));
        }

        let bytes = tokio::fs::read(&output_path)
            .await
            .map_err(|e| DomainError::EngineExecutionFailure(format!("FFmpeg produced no output: {}", e)))?;
        if bytes.is_empty() {
            return Err(DomainError::EngineExecutionFailure("FFmpeg produced an empty file".to_string()));
        }

        debug!("Transcode produced {} bytes", bytes.len());
        Ok(bytes)
    }
}
