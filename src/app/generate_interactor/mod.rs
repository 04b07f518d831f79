// Generate interactor - Orchestrates the crop-to-GIF use case

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::crop::{initial_region, CropSettings};
use crate::domain::errors::*;
use crate::domain::geometry;
use crate::domain::model::*;
use crate::domain::rules::{check_start_time, MediaTypeRule, ResourceLimits};
use crate::engine::{JobEvent, ProcessingOrchestrator, ProgressCallback};
use crate::error::{GifCropError, GifCropResult};
use crate::output::{artifact_file_name, ArtifactWriter, GeneratedArtifact};
use crate::ports::*;

/// How the user picked the crop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CropSelection {
    /// Already in media pixels
    Source(SourceCropParams),
    /// A display-space region drawn in a container of the given size
    Display { region: CropRegion, container: Size },
    /// The default centered square, as if the media filled the container
    Centered,
}

/// One generation command
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateCommand {
    pub source: PathBuf,
    pub start_time: TimeSpec,
    pub selection: CropSelection,
}

/// Interactor for the crop-to-GIF use case
pub struct GenerateInteractor {
    probe_port: Arc<dyn MediaProbePort>,
    engine: Arc<dyn TranscodePort>,
    confirm_port: Arc<dyn ConfirmationPort>,
    writer: ArtifactWriter,
    policy: GenerationPolicy,
    limits: ResourceLimits,
    crop_settings: CropSettings,
}

impl GenerateInteractor {
    pub fn new(
        probe_port: Arc<dyn MediaProbePort>,
        engine: Arc<dyn TranscodePort>,
        confirm_port: Arc<dyn ConfirmationPort>,
        writer: ArtifactWriter,
        policy: GenerationPolicy,
        limits: ResourceLimits,
        crop_settings: CropSettings,
    ) -> Self {
        Self {
            probe_port,
            engine,
            confirm_port,
            writer,
            policy,
            limits,
            crop_settings,
        }
    }

    /// Validate the source, confirm advisories and build the engine request
    pub async fn prepare(&self, command: &GenerateCommand) -> Result<GenerateRequest, DomainError> {
        MediaTypeRule::check_path(&command.source)?;

        let media_info = self.probe_port.probe_media(&command.source).await?;
        MediaTypeRule::check_media(&media_info)?;

        for advisory in self.limits.check(media_info.file_size, media_info.duration.seconds) {
            if !self.confirm_port.confirm(&advisory.prompt()) {
                info!("User declined: {}", advisory.prompt());
                return Err(advisory.into_error());
            }
        }

        check_start_time(command.start_time.seconds, media_info.duration.seconds)?;

        let media = media_info.dimensions()?;
        let crop = self.resolve_crop(&command.selection, media)?;
        let request = GenerateRequest::new(command.source.clone(), command.start_time.seconds, crop, self.policy);
        request.validate()?;
        Ok(request)
    }

    /// Map the selection to media pixels, always inside the frame
    pub fn resolve_crop(
        &self,
        selection: &CropSelection,
        media: MediaDimensions,
    ) -> Result<SourceCropParams, DomainError> {
        let raw = match selection {
            CropSelection::Source(params) => *params,
            CropSelection::Display { region, container } => {
                region.validate(*container, self.crop_settings.min_size)?;
                let rect = geometry::compute_display_rect(*container, media);
                geometry::to_source_crop(region, &rect, media)
            }
            CropSelection::Centered => {
                let container = media.as_size();
                let region = initial_region(container, media, &self.crop_settings)?;
                let rect = geometry::compute_display_rect(container, media);
                geometry::to_source_crop(&region, &rect, media)
            }
        };

        let fitted = raw.fit_within(media);
        if fitted != raw {
            warn!(
                "Crop {}x{}+{}+{} exceeds {}x{} media, using {}x{}+{}+{}",
                raw.size, raw.size, raw.x, raw.y, media.width, media.height, fitted.size, fitted.size, fitted.x, fitted.y
            );
        }
        if fitted.size == 0 {
            return Err(DomainError::InvalidInput("Crop size must be at least one pixel".to_string()));
        }
        Ok(fitted)
    }

    /// Run the whole use case. Resolving `cancel` stops the job.
    pub async fn execute<C>(
        &self,
        command: GenerateCommand,
        progress: &dyn ProgressCallback,
        cancel: C,
    ) -> GifCropResult<GeneratedArtifact>
    where
        C: Future<Output = ()>,
    {
        let request = self.prepare(&command).await?;
        let crop = request.crop;
        let start_time = request.start_time;

        let mut orchestrator = ProcessingOrchestrator::new(Arc::clone(&self.engine));
        let receipt = orchestrator.submit(request)?;
        progress.on_start(&format!("Generating GIF from {}", command.source.display()));

        tokio::pin!(cancel);
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    orchestrator.cancel();
                    progress.on_cancel();
                    return Err(DomainError::Cancelled.into());
                }
                event = orchestrator.next_event() => match event {
                    Some(JobEvent::Progress { percent, message, .. }) => progress.on_progress(percent, &message),
                    Some(JobEvent::Succeeded { bytes, .. }) => {
                        progress.on_complete(bytes);
                        break;
                    }
                    Some(JobEvent::Failed { error, .. }) => {
                        progress.on_error(&error.to_string());
                        return Err(error.into());
                    }
                    None => {
                        let error = DomainError::EngineExecutionFailure(format!("{} ended without a result", receipt.job));
                        progress.on_error(&error.to_string());
                        return Err(error.into());
                    }
                }
            }
        }

        let bytes = orchestrator.take_output().ok_or_else(|| GifCropError::OutputError {
            message: "job succeeded without output".to_string(),
        })?;
        let created_at = Utc::now();
        let path = self.writer.write(&artifact_file_name(created_at), &bytes)?;

        Ok(GeneratedArtifact {
            path,
            bytes: bytes.len(),
            created_at,
            start_time,
            crop,
        })
    }
}

#[cfg(test)]
mod tests;
