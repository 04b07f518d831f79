// Domain rules - Input acceptance and resource policies

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::MediaInfo;

/// Container formats the tool accepts
const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "m4v", "webm", "mov", "qt"];

/// Business rules for accepting a source file
pub struct MediaTypeRule;

impl MediaTypeRule {
    /// Reject files whose extension is not a supported video container
    pub fn check_path(path: &Path) -> Result<(), DomainError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension {
            Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(DomainError::InvalidInput(format!(
                "Please select a valid video file (MP4, WebM, MOV): {}",
                path.display()
            ))),
        }
    }

    /// Reject probed media that cannot be cropped into an animated image
    pub fn check_media(info: &MediaInfo) -> Result<(), DomainError> {
        if info.width == 0 || info.height == 0 {
            return Err(DomainError::InvalidInput("Video has no picture dimensions".to_string()));
        }
        if info.duration.seconds <= 0.0 {
            return Err(DomainError::InvalidInput(
                "Video has no duration or could not be read".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resource thresholds above which the user is asked to confirm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    pub max_file_bytes: u64,
    pub max_duration_secs: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 200 * 1024 * 1024,
            max_duration_secs: 60.0,
        }
    }
}

/// A resource condition that needs confirmation, never a hard failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceAdvisory {
    LargeFile { bytes: u64, limit: u64 },
    LongMedia { seconds: f64, limit: f64 },
}

impl ResourceAdvisory {
    /// Prompt text shown before asking to continue
    pub fn prompt(&self) -> String {
        match self {
            ResourceAdvisory::LargeFile { limit, .. } => format!(
                "Large file detected (>{}MB). Processing may be slow. Continue?",
                limit / (1024 * 1024)
            ),
            ResourceAdvisory::LongMedia { limit, .. } => format!(
                "Long video detected (>{}s). Processing may be slow. Continue?",
                limit
            ),
        }
    }

    /// The advisory expressed as a domain error, for callers that decline
    pub fn into_error(self) -> DomainError {
        DomainError::ResourceLimit(self.prompt())
    }
}

impl ResourceLimits {
    /// Collect advisories for a file of the given size and duration
    pub fn check(&self, file_size: u64, duration_secs: f64) -> Vec<ResourceAdvisory> {
        let mut advisories = Vec::new();
        if file_size > self.max_file_bytes {
            advisories.push(ResourceAdvisory::LargeFile {
                bytes: file_size,
                limit: self.max_file_bytes,
            });
        }
        if duration_secs > self.max_duration_secs {
            advisories.push(ResourceAdvisory::LongMedia {
                seconds: duration_secs,
                limit: self.max_duration_secs,
            });
        }
        advisories
    }
}

/// Start times must leave the seek point inside the media
pub fn check_start_time(start: f64, duration: f64) -> Result<(), DomainError> {
    if !start.is_finite() || start < 0.0 {
        return Err(DomainError::InvalidInput(format!("Start time must be non-negative, got {}", start)));
    }
    if start >= duration {
        return Err(DomainError::InvalidInput(format!(
            "Start time {:.2}s is beyond the end of the video ({:.2}s)",
            start, duration
        )));
    }
    Ok(())
}
