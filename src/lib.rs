//! GifCrop Library
//!
//! Square animated thumbnails from video clips: a crop-region state machine,
//! display-to-source geometry mapping and a single-job transcode orchestrator
//! driving an external ffmpeg.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod crop;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use crop::{CropEvent, CropRegionController, CropSettings, EventOutcome, InteractionState};
pub use domain::errors::DomainError;
pub use domain::model::{
    CropRegion, DisplayRect, GenerateRequest, GenerationPolicy, MediaDimensions, MediaInfo, Size, SourceCropParams,
    TimeSpec,
};
pub use engine::{JobEvent, JobId, JobStatus, ProcessingOrchestrator};
pub use error::{GifCropError, GifCropResult};
