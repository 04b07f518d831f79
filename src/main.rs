//! GifCrop CLI
//!
//! Renders a short square GIF from a region of a video.
//!
//! # Usage
//!
//! ```bash
//! gifcrop inspect --input clip.mp4 --container 800x450
//! gifcrop generate --input clip.mp4 --start 00:12.5 --crop 300,168.75,180 --container 800x450
//! gifcrop generate --input clip.mp4 --source-crop 720,405,432 --output-dir thumbs
//! gifcrop crop --container 800x450 --media 1920x1080 --events session.json
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use gifcrop::app::DefaultAppContainer;
use gifcrop::cli::{commands, Cli, Commands};
use gifcrop::config_initialization::initialize_configuration_hierarchy;
use gifcrop::domain::errors::DomainError;
use gifcrop::error::GifCropError;
use gifcrop::utils::logging::init_logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<GifCropError>() {
        return err.exit_code();
    }
    if let Some(err) = e.downcast_ref::<DomainError>() {
        return GifCropError::from(err.clone()).exit_code();
    }
    1
}

async fn run(cli: Cli) -> Result<()> {
    let config = initialize_configuration_hierarchy(&cli)?;
    init_logging(&config.logging);
    debug!("Starting GifCrop {}", env!("CARGO_PKG_VERSION"));

    let container = DefaultAppContainer::new(config);
    match cli.command {
        Commands::Generate(args) => commands::generate(args, &container).await,
        Commands::Inspect(args) => commands::inspect(args, &container).await,
        Commands::Crop(args) => commands::crop(args, &container),
    }
}
