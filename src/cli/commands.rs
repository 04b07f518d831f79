//! Command implementations

use std::io::{self, BufRead, IsTerminal, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::app::{
    AppContainer, CropSelection, DefaultAppContainer, GenerateCommand, InspectRequest, SessionReport, SessionScript,
};
use crate::cli::args::{CropArgs, GenerateArgs, InspectArgs};
use crate::crop::CropEvent;
use crate::domain::model::TimeSpec;
use crate::engine::{ConsoleProgressCallback, JsonProgressCallback, ProgressCallback};
use crate::error::GifCropError;
use crate::output::OverwritePolicy;
use crate::ports::ConfirmationPort;

/// Asks on the terminal; anything but "y"/"yes" declines
pub struct TerminalConfirmation;

impl ConfirmationPort for TerminalConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        if !io::stdin().is_terminal() {
            eprintln!("{} (use --yes to proceed non-interactively)", prompt);
            return false;
        }
        eprint!("{} [y/N] ", prompt);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Accepts every prompt (`--yes`)
pub struct AssumeYes;

impl ConfirmationPort for AssumeYes {
    fn confirm(&self, prompt: &str) -> bool {
        info!("Proceeding: {}", prompt);
        true
    }
}

/// Execute the generate command
pub async fn generate(args: GenerateArgs, container: &DefaultAppContainer) -> Result<()> {
    let start_time =
        TimeSpec::parse(&args.start).map_err(|_| GifCropError::InvalidTimeFormat { time: args.start.clone() })?;

    let selection = match (args.source_crop, args.crop, args.container) {
        (Some(params), _, _) => CropSelection::Source(params),
        (None, Some(region), Some(container)) => CropSelection::Display { region, container },
        (None, Some(region), None) => {
            return Err(GifCropError::InvalidGeometry {
                what: "crop without --container",
                value: format!("{},{},{}", region.x, region.y, region.size),
            }
            .into())
        }
        (None, None, _) => CropSelection::Centered,
    };

    let confirm: Arc<dyn ConfirmationPort> = if args.yes {
        Arc::new(AssumeYes)
    } else {
        Arc::new(TerminalConfirmation)
    };
    let overwrite = if args.overwrite {
        OverwritePolicy::Always
    } else {
        OverwritePolicy::Never
    };
    let progress: Box<dyn ProgressCallback> = if args.json {
        Box::new(JsonProgressCallback)
    } else {
        Box::new(ConsoleProgressCallback::new(false))
    };

    info!("Input: {}", args.input.display());
    info!("Start: {}", start_time);

    let interactor = container.generate_interactor(confirm, overwrite);
    let command = GenerateCommand {
        source: args.input,
        start_time,
        selection,
    };
    let cancel = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let artifact = interactor.execute(command, progress.as_ref(), cancel).await?;

    if args.json {
        println!("{}", serde_json::json!({ "event": "artifact", "artifact": artifact }));
    } else {
        println!("{}", artifact.path.display());
    }
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(args: InspectArgs, container: &DefaultAppContainer) -> Result<()> {
    let response = container
        .inspect_interactor()
        .execute(InspectRequest {
            input: args.input,
            container: args.container,
            format: args.format,
        })
        .await?;

    print!("{}", response.summary);
    if !response.summary.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Execute the crop command
pub fn crop(args: CropArgs, container: &DefaultAppContainer) -> Result<()> {
    let events = match &args.events {
        Some(path) => read_events(path)?,
        None => Vec::new(),
    };

    let script = SessionScript {
        container: args.container,
        media: args.media,
        region: args.region,
        events,
    };
    let report = container.session_interactor().execute(&script)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_session(&report));
    }
    Ok(())
}

fn read_events(path: &Path) -> Result<Vec<CropEvent>> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read events from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read events from {}", path.display()))?
    };
    let events = serde_json::from_str(&content).map_err(GifCropError::ScriptError)?;
    Ok(events)
}

fn event_name(event: &CropEvent) -> &'static str {
    match event {
        CropEvent::PointerDown { .. } => "pointer_down",
        CropEvent::PointerMove { .. } => "pointer_move",
        CropEvent::PointerUp => "pointer_up",
        CropEvent::KeyDown { .. } => "key_down",
        CropEvent::ContainerResized { .. } => "container_resized",
    }
}

fn format_session(report: &SessionReport) -> String {
    use crate::app::session_interactor::StepOutcome;

    let mut out = String::new();
    for step in &report.steps {
        let outcome = match &step.outcome {
            StepOutcome::Applied => "applied".to_string(),
            StepOutcome::NoChange => "no change".to_string(),
            StepOutcome::Ignored => "ignored".to_string(),
            StepOutcome::Rejected { reason } => format!("rejected ({})", reason),
        };
        out.push_str(&format!(
            "#{:<3} {:<17} {:<28} {},{},{} [{}]\n",
            step.index,
            event_name(&step.event),
            outcome,
            step.region.x,
            step.region.y,
            step.region.size,
            step.interaction
        ));
    }

    let region = &report.final_region;
    let crop = &report.source_crop;
    out.push_str(&format!("Region: {},{},{}\n", region.x, region.y, region.size));
    out.push_str(&format!("Source crop: {},{},{}\n", crop.x, crop.y, crop.size));
    out
}
