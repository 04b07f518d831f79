// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait MediaProbePort: Send + Sync {
    /// Probe media file and return its metadata
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError>;
}

/// Everything the transcoding engine needs for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscodeRequest {
    pub source: PathBuf,
    pub start_time_seconds: f64,
    pub duration_seconds: f64,
    pub crop_x: u32,
    pub crop_y: u32,
    pub crop_size: u32,
    pub output_size: u32,
    pub fps: u32,
}

impl From<&GenerateRequest> for TranscodeRequest {
    fn from(request: &GenerateRequest) -> Self {
        Self {
            source: request.source.clone(),
            start_time_seconds: request.start_time,
            duration_seconds: request.duration,
            crop_x: request.crop.x,
            crop_y: request.crop.y,
            crop_size: request.crop.size,
            output_size: request.output_size,
            fps: request.fps,
        }
    }
}

/// Raw signals streamed by the engine while a transcode runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// Continuous completion of the whole pipeline, 0.0 to 1.0
    Fraction(f64),
    /// One line of engine log output; may embed a `frame=` counter
    Log(String),
}

/// Port for the external decode/filter/encode pipeline
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Make the engine ready; failures are reported as `EngineLoadFailure`
    async fn load(&self) -> Result<(), DomainError>;

    /// Run one transcode to completion and return the encoded GIF.
    ///
    /// Dropping the returned future must stop the work.
    async fn transcode(
        &self,
        request: &TranscodeRequest,
        signals: UnboundedSender<EngineSignal>,
    ) -> Result<Vec<u8>, DomainError>;
}

/// Port for yes/no questions put to the user
pub trait ConfirmationPort: Send + Sync {
    /// Ask `prompt`; `true` means proceed
    fn confirm(&self, prompt: &str) -> bool;
}
