//! Configuration initialization and hierarchy management

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::adapters::{AppConfig, TomlConfigAdapter};
use crate::cli::{Cli, Commands};
use crate::crop::ResizePolicy;
use crate::error::{GifCropError, GifCropResult};
use crate::utils::logging::{LogFormat, LogLevel};

/// Resolve configuration following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> GifCropResult<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => TomlConfigAdapter::load(path)?,
        None => TomlConfigAdapter::discover(Path::new("."))?,
    };

    let env_overrides = apply_environment_overrides(&mut config, |key| std::env::var(key).ok())?;
    let cli_overrides = apply_cli_overrides(&mut config, cli);
    debug!(
        "Configuration resolved with {} environment and {} CLI overrides",
        env_overrides, cli_overrides
    );
    Ok(config)
}

fn parse_env<T>(key: &str, value: &str) -> GifCropResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| GifCropError::ConfigError {
        path: format!("${}", key),
        message: e.to_string(),
    })
}

/// Apply `GIFCROP_*` variables; `lookup` returns the value of a variable
pub fn apply_environment_overrides<F>(config: &mut AppConfig, lookup: F) -> GifCropResult<usize>
where
    F: Fn(&str) -> Option<String>,
{
    let mut applied = 0;

    if let Some(value) = lookup("GIFCROP_LOG_LEVEL") {
        config.logging.level = parse_env::<LogLevel>("GIFCROP_LOG_LEVEL", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_LOG_FORMAT") {
        config.logging.format = parse_env::<LogFormat>("GIFCROP_LOG_FORMAT", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_FFMPEG") {
        config.engine.ffmpeg_path = value.into();
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_FFPROBE") {
        config.engine.ffprobe_path = value.into();
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_OUTPUT_DIR") {
        config.output.directory = value.into();
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_DURATION") {
        config.generation.duration_secs = parse_env("GIFCROP_DURATION", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_FPS") {
        config.generation.fps = parse_env("GIFCROP_FPS", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_OUTPUT_SIZE") {
        config.generation.output_size = parse_env("GIFCROP_OUTPUT_SIZE", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_MIN_CROP_SIZE") {
        config.crop.min_size = parse_env("GIFCROP_MIN_CROP_SIZE", &value)?;
        applied += 1;
    }
    if let Some(value) = lookup("GIFCROP_RESIZE_POLICY") {
        config.crop.resize_policy = match value.trim().to_ascii_lowercase().as_str() {
            "reclamp" => ResizePolicy::Reclamp,
            "refit" => ResizePolicy::Refit,
            other => {
                return Err(GifCropError::ConfigError {
                    path: "$GIFCROP_RESIZE_POLICY".to_string(),
                    message: format!("expected reclamp or refit, got {}", other),
                })
            }
        };
        applied += 1;
    }

    Ok(applied)
}

/// Apply command-line overrides
pub fn apply_cli_overrides(config: &mut AppConfig, cli: &Cli) -> usize {
    let mut applied = 0;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
        applied += 1;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
        applied += 1;
    }
    if let Some(path) = &cli.ffmpeg {
        config.engine.ffmpeg_path = path.clone();
        applied += 1;
    }
    if let Some(path) = &cli.ffprobe {
        config.engine.ffprobe_path = path.clone();
        applied += 1;
    }

    if let Commands::Generate(args) = &cli.command {
        if let Some(dir) = &args.output_dir {
            config.output.directory = dir.clone();
            applied += 1;
        }
        if let Some(duration) = args.duration {
            config.generation.duration_secs = duration;
            applied += 1;
        }
        if let Some(fps) = args.fps {
            config.generation.fps = fps;
            applied += 1;
        }
        if let Some(size) = args.output_size {
            config.generation.output_size = size;
            applied += 1;
        }
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let mut config = AppConfig::default();
        let applied = apply_environment_overrides(
            &mut config,
            lookup(&[
                ("GIFCROP_FPS", "12"),
                ("GIFCROP_FFMPEG", "/usr/local/bin/ffmpeg"),
                ("GIFCROP_RESIZE_POLICY", "Refit"),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 3);
        assert_eq!(config.generation.fps, 12);
        assert_eq!(config.engine.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.crop.resize_policy, ResizePolicy::Refit);
    }

    #[test]
    fn test_bad_environment_value_names_variable() {
        let mut config = AppConfig::default();
        let err = apply_environment_overrides(&mut config, lookup(&[("GIFCROP_FPS", "fast")])).unwrap_err();
        assert!(err.to_string().contains("$GIFCROP_FPS"));
    }

    #[test]
    fn test_cli_beats_environment() {
        let mut config = AppConfig::default();
        apply_environment_overrides(
            &mut config,
            lookup(&[("GIFCROP_FPS", "12"), ("GIFCROP_LOG_LEVEL", "warn")]),
        )
        .unwrap();

        let cli = Cli::parse_from([
            "gifcrop",
            "--log-level",
            "debug",
            "generate",
            "--input",
            "clip.mp4",
            "--fps",
            "20",
            "--output-dir",
            "out",
        ]);
        assert_eq!(apply_cli_overrides(&mut config, &cli), 3);
        assert_eq!(config.generation.fps, 20);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.output.directory, PathBuf::from("out"));
    }
}
