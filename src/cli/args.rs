//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::app::InspectFormat;
use crate::domain::model::{CropRegion, MediaDimensions, Size, SourceCropParams};

/// Arguments for the generate command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Input video file path (MP4, WebM, MOV)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Start time (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long, default_value = "0")]
    pub start: String,

    /// Crop in video pixels as X,Y,SIZE
    #[arg(long, conflicts_with = "crop")]
    pub source_crop: Option<SourceCropParams>,

    /// Crop in display pixels as X,Y,SIZE, relative to --container
    #[arg(long, requires = "container")]
    pub crop: Option<CropRegion>,

    /// Display container the --crop was drawn in, as WIDTHxHEIGHT
    #[arg(long)]
    pub container: Option<Size>,

    /// Directory for the generated GIF
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Clip length in seconds
    #[arg(long)]
    pub duration: Option<f64>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Edge length of the square GIF in pixels
    #[arg(long)]
    pub output_size: Option<u32>,

    /// Replace an existing file with the same name
    #[arg(long)]
    pub overwrite: bool,

    /// Proceed past large-file and long-video warnings without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Emit progress and the result as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Preview the default crop in a container of WIDTHxHEIGHT
    #[arg(long)]
    pub container: Option<Size>,

    /// Report format (text, json, yaml)
    #[arg(long, default_value = "text")]
    pub format: InspectFormat,
}

/// Arguments for the crop command
#[derive(Args, Debug)]
pub struct CropArgs {
    /// Display container as WIDTHxHEIGHT
    #[arg(long)]
    pub container: Size,

    /// Native video dimensions as WIDTHxHEIGHT
    #[arg(long)]
    pub media: MediaDimensions,

    /// JSON array of events; "-" reads standard input
    #[arg(long)]
    pub events: Option<PathBuf>,

    /// Starting region as X,Y,SIZE instead of the centered default
    #[arg(long)]
    pub region: Option<CropRegion>,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}
