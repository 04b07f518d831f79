// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::crop::CropSettings;
use crate::domain::model::GenerationPolicy;
use crate::domain::rules::ResourceLimits;
use crate::error::{GifCropError, GifCropResult};
use crate::utils::logging::LoggingConfig;

/// Files looked up, in order, when no `--config` is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["gifcrop.toml", "config/gifcrop.toml"];

/// External binaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
        }
    }
}

/// Where generated files go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub generation: GenerationPolicy,
    pub limits: ResourceLimits,
    pub crop: CropSettings,
    pub engine: EngineSettings,
    pub output: OutputSettings,
    pub logging: LoggingConfig,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse configuration from TOML text; missing keys fall back to defaults
    pub fn parse(content: &str, origin: &Path) -> GifCropResult<AppConfig> {
        toml::from_str(content).map_err(|e| GifCropError::ConfigError {
            path: origin.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load one configuration file
    pub fn load(path: &Path) -> GifCropResult<AppConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| GifCropError::ConfigError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::parse(&content, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the first default file that exists, or the defaults
    pub fn discover(base: &Path) -> GifCropResult<AppConfig> {
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = base.join(candidate);
            if path.is_file() {
                return Self::load(&path);
            }
        }
        debug!("No configuration file found, using defaults");
        Ok(AppConfig::default())
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(config: &AppConfig) -> GifCropResult<String> {
        toml::to_string_pretty(config).map_err(|e| GifCropError::ConfigError {
            path: "<memory>".to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::ResizePolicy;
    use crate::utils::logging::LogLevel;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = TomlConfigAdapter::parse(
            r#"
            [generation]
            fps = 15

            [crop]
            resize_policy = "refit"

            [engine]
            ffmpeg_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
            Path::new("test.toml"),
        )
        .unwrap();

        assert_eq!(config.generation.fps, 15);
        assert_eq!(config.generation.duration_secs, 4.0);
        assert_eq!(config.generation.output_size, 62);
        assert_eq!(config.crop.resize_policy, ResizePolicy::Refit);
        assert_eq!(config.crop.min_size, 50.0);
        assert_eq!(config.engine.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(config.engine.ffprobe_path, PathBuf::from("ffprobe"));
        assert_eq!(config.limits, ResourceLimits::default());
    }

    #[test]
    fn test_invalid_toml_names_the_file() {
        let err = TomlConfigAdapter::parse("[generation\nfps = 1", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_discover_and_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(TomlConfigAdapter::discover(dir.path()).unwrap(), AppConfig::default());

        let mut config = AppConfig::default();
        config.logging.level = LogLevel::Debug;
        config.limits.max_duration_secs = 30.0;
        std::fs::create_dir(dir.path().join("config")).unwrap();
        std::fs::write(
            dir.path().join("config/gifcrop.toml"),
            TomlConfigAdapter::to_toml(&config).unwrap(),
        )
        .unwrap();

        assert_eq!(TomlConfigAdapter::discover(dir.path()).unwrap(), config);
    }
}
