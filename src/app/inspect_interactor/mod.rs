// Inspect interactor - Orchestrates media file inspection use case

use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::crop::{initial_region, CropSettings};
use crate::domain::errors::*;
use crate::domain::geometry;
use crate::domain::model::*;
use crate::domain::rules::{MediaTypeRule, ResourceAdvisory, ResourceLimits};
use crate::ports::*;
use crate::utils::format_file_size;

/// Output format for inspection reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl FromStr for InspectFormat {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(InspectFormat::Text),
            "json" => Ok(InspectFormat::Json),
            "yaml" | "yml" => Ok(InspectFormat::Yaml),
            other => Err(DomainError::InvalidInput(format!("Unknown report format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectRequest {
    pub input: PathBuf,
    /// When set, the report previews the default crop in a container of this size
    pub container: Option<Size>,
    pub format: InspectFormat,
}

/// Where the media and the default crop land in a container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutPreview {
    pub container: Size,
    pub display_rect: DisplayRect,
    pub initial_region: CropRegion,
    pub source_crop: SourceCropParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectReport {
    pub source: PathBuf,
    pub media: MediaInfo,
    pub advisories: Vec<ResourceAdvisory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutPreview>,
}

#[derive(Debug, Clone)]
pub struct InspectResponse {
    pub report: InspectReport,
    pub summary: String,
}

/// Interactor for media file inspection use case
pub struct InspectInteractor {
    probe_port: Arc<dyn MediaProbePort>,
    limits: ResourceLimits,
    crop_settings: CropSettings,
}

impl InspectInteractor {
    pub fn new(probe_port: Arc<dyn MediaProbePort>, limits: ResourceLimits, crop_settings: CropSettings) -> Self {
        Self {
            probe_port,
            limits,
            crop_settings,
        }
    }

    /// Execute media file inspection
    pub async fn execute(&self, request: InspectRequest) -> Result<InspectResponse, DomainError> {
        info!("Starting media file inspection for: {}", request.input.display());
        MediaTypeRule::check_path(&request.input)?;

        let media = self.probe_port.probe_media(&request.input).await?;
        MediaTypeRule::check_media(&media)?;
        let advisories = self.limits.check(media.file_size, media.duration.seconds);

        let layout = match request.container {
            Some(container) => Some(self.preview(container, media.dimensions()?)?),
            None => None,
        };

        let report = InspectReport {
            source: request.input,
            media,
            advisories,
            layout,
        };

        let summary = match request.format {
            InspectFormat::Json => serde_json::to_string_pretty(&report)
                .map_err(|e| DomainError::InvalidInput(format!("JSON serialization failed: {}", e)))?,
            InspectFormat::Yaml => serde_yaml::to_string(&report)
                .map_err(|e| DomainError::InvalidInput(format!("YAML serialization failed: {}", e)))?,
            InspectFormat::Text => format_as_text(&report),
        };

        info!("Media file inspection completed successfully");
        Ok(InspectResponse { report, summary })
    }

    fn preview(&self, container: Size, media: MediaDimensions) -> Result<LayoutPreview, DomainError> {
        let display_rect = geometry::compute_display_rect(container, media);
        let region = initial_region(container, media, &self.crop_settings)?;
        Ok(LayoutPreview {
            container,
            display_rect,
            initial_region: region,
            source_crop: geometry::to_source_crop(&region, &display_rect, media),
        })
    }
}

fn format_as_text(report: &InspectReport) -> String {
    let media = &report.media;
    let mut out = String::new();
    let _ = writeln!(out, "File: {}", report.source.display());
    let _ = writeln!(out, "Format: {}", media.format);
    let _ = writeln!(out, "Size: {}", format_file_size(media.file_size));
    let _ = writeln!(out, "Duration: {}", media.duration);
    let _ = writeln!(
        out,
        "Video: {} {}x{} @ {:.2} fps",
        media.codec, media.width, media.height, media.frame_rate
    );
    let _ = writeln!(out, "Audio: {}", if media.has_audio { "yes" } else { "no" });

    for advisory in &report.advisories {
        let _ = writeln!(out, "Warning: {}", advisory.prompt());
    }

    if let Some(layout) = &report.layout {
        let rect = &layout.display_rect;
        let region = &layout.initial_region;
        let crop = &layout.source_crop;
        let _ = writeln!(
            out,
            "Display: {:.2}x{:.2} at ({:.2}, {:.2}) in {}x{}",
            rect.width, rect.height, rect.offset_x, rect.offset_y, layout.container.width, layout.container.height
        );
        let _ = writeln!(out, "Default crop: {},{},{}", region.x, region.y, region.size);
        let _ = writeln!(out, "Source crop: {},{},{}", crop.x, crop.y, crop.size);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;

    struct FixedProbe(MediaInfo);

    #[async_trait]
    impl MediaProbePort for FixedProbe {
        async fn probe_media(&self, _file_path: &Path) -> Result<MediaInfo, DomainError> {
            Ok(self.0.clone())
        }
    }

    fn interactor(duration: f64) -> InspectInteractor {
        InspectInteractor::new(
            Arc::new(FixedProbe(MediaInfo {
                width: 1920,
                height: 1080,
                duration: TimeSpec::from_seconds(duration),
                frame_rate: 25.0,
                codec: "h264".to_string(),
                format: "mp4".to_string(),
                file_size: 5 * 1024 * 1024,
                has_audio: false,
            })),
            ResourceLimits::default(),
            CropSettings::default(),
        )
    }

    fn request(format: InspectFormat, container: Option<Size>) -> InspectRequest {
        InspectRequest {
            input: PathBuf::from("clip.mov"),
            container,
            format,
        }
    }

    #[tokio::test]
    async fn test_text_report_with_layout() {
        let response = interactor(12.0)
            .execute(request(InspectFormat::Text, Some(Size::new(800.0, 450.0).unwrap())))
            .await
            .unwrap();

        let layout = response.report.layout.unwrap();
        assert_eq!(layout.initial_region, CropRegion::new(310.0, 135.0, 180.0));
        assert_eq!(layout.source_crop, SourceCropParams::new(744, 324, 432));
        assert!(response.summary.contains("Video: h264 1920x1080 @ 25.00 fps"));
        assert!(response.summary.contains("Source crop: 744,324,432"));
        assert!(!response.summary.contains("Warning"));
    }

    #[tokio::test]
    async fn test_long_media_advisory_is_reported() {
        let response = interactor(75.0).execute(request(InspectFormat::Json, None)).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&response.summary).unwrap();

        assert_eq!(json["advisories"][0]["kind"], "long_media");
        assert!(json.get("layout").is_none());
    }

    #[tokio::test]
    async fn test_yaml_report() {
        let response = interactor(5.0).execute(request(InspectFormat::Yaml, None)).await.unwrap();
        assert!(response.summary.contains("codec: h264"));
    }

    #[tokio::test]
    async fn test_rejects_unsupported_extension() {
        let mut req = request(InspectFormat::Text, None);
        req.input = PathBuf::from("clip.avi");
        assert!(matches!(
            interactor(5.0).execute(req).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("YAML".parse::<InspectFormat>().unwrap(), InspectFormat::Yaml);
        assert!("xml".parse::<InspectFormat>().is_err());
    }
}
