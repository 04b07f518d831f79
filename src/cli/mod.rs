//! CLI module for GifCrop
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::utils::logging::{LogFormat, LogLevel};

pub mod args;
pub mod commands;

/// GifCrop - square animated thumbnails from video clips
///
/// Pick a square region of a video and a start time; GifCrop renders a short
/// looping GIF from it with ffmpeg.
#[derive(Parser, Debug)]
#[command(name = "gifcrop")]
#[command(about = "GifCrop - Square GIF thumbnails from video clips")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log output format (text, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Configuration file (default: gifcrop.toml or config/gifcrop.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the ffmpeg binary
    #[arg(long, global = true)]
    pub ffmpeg: Option<PathBuf>,

    /// Path to the ffprobe binary
    #[arg(long, global = true)]
    pub ffprobe: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a square GIF from a region of a video
    Generate(args::GenerateArgs),
    /// Show video metadata, resource warnings and the default crop
    Inspect(args::InspectArgs),
    /// Replay crop interaction events and print the resulting region
    Crop(args::CropArgs),
}
