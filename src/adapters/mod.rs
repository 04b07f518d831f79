// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod probe_ffprobe;
pub mod toml_config;

// Re-export adapters
pub use exec_ffmpeg::FFmpegEngine;
pub use probe_ffprobe::FFprobeAdapter;
pub use toml_config::{AppConfig, EngineSettings, OutputSettings, TomlConfigAdapter};
