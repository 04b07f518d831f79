//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json` and maps the result onto `MediaInfo`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe_path: PathBuf,
}

impl FFprobeAdapter {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

/// Parse a frame rate such as "30/1" or "30000/1001"
fn parse_frame_rate(s: &str) -> f64 {
    if let Some((num, den)) = s.split_once('/') {
        let n: f64 = num.parse().unwrap_or(0.0);
        let d: f64 = den.parse().unwrap_or(1.0);
        if d > 0.0 {
            n / d
        } else {
            0.0
        }
    } else {
        s.parse().unwrap_or(0.0)
    }
}

/// Map ffprobe's JSON document onto `MediaInfo`
pub fn parse_probe_output(json: &[u8], file_size_hint: u64) -> Result<MediaInfo, DomainError> {
    let json: Value = serde_json::from_slice(json)
        .map_err(|e| DomainError::ProbeFailure(format!("Failed to parse ffprobe output: {}", e)))?;

    let streams = json["streams"]
        .as_array()
        .ok_or_else(|| DomainError::ProbeFailure("No streams found in video".to_string()))?;

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| DomainError::InvalidInput("No video stream found".to_string()))?;

    let has_audio = streams.iter().any(|s| s["codec_type"].as_str() == Some("audio"));

    let width = video_stream["width"]
        .as_u64()
        .ok_or_else(|| DomainError::ProbeFailure("Could not read video width".to_string()))? as u32;
    let height = video_stream["height"]
        .as_u64()
        .ok_or_else(|| DomainError::ProbeFailure("Could not read video height".to_string()))? as u32;

    let codec = video_stream["codec_name"].as_str().unwrap_or("unknown").to_string();
    let format = json["format"]["format_name"].as_str().unwrap_or("unknown").to_string();
    let frame_rate = parse_frame_rate(video_stream["r_frame_rate"].as_str().unwrap_or("0/1"));

    // Stream duration first, then container duration
    let duration = video_stream["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| json["format"]["duration"].as_str().and_then(|d| d.parse::<f64>().ok()))
        .unwrap_or(0.0);

    let file_size = json["format"]["size"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(file_size_hint);

    Ok(MediaInfo {
        width,
        height,
        duration: TimeSpec::from_seconds(duration),
        frame_rate,
        codec,
        format,
        file_size,
        has_audio,
    })
}

#[async_trait]
impl MediaProbePort for FFprobeAdapter {
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        let metadata = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| DomainError::FsFailure(format!("Cannot open {}: {}", file_path.display(), e)))?;

        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(file_path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| DomainError::ProbeFailure(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(DomainError::ProbeFailure(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let info = parse_probe_output(&output.stdout, metadata.len())?;
        debug!(
            "Probed {}: {}x{} {:.3}s {}",
            file_path.display(),
            info.width,
            info.height,
            info.duration.seconds,
            info.codec
        );
        Ok(info)
    }
}
