//! Generated artifact naming and writing

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::model::SourceCropParams;

pub mod writer;

pub use writer::ArtifactWriter;

/// Overwrite policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Fail if the target exists
    #[default]
    Never,
    /// Replace the target
    Always,
}

/// File name for an artifact created at `at`: `gif-thumbnail-<unix millis>.gif`
pub fn artifact_file_name(at: DateTime<Utc>) -> String {
    format!("gif-thumbnail-{}.gif", at.timestamp_millis())
}

/// Summary of a written GIF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub bytes: usize,
    pub created_at: DateTime<Utc>,
    pub start_time: f64,
    pub crop: SourceCropParams,
}
