use std::sync::Arc;

use crate::adapters::{AppConfig, FFmpegEngine, FFprobeAdapter};
use crate::app::{
    generate_interactor::GenerateInteractor, inspect_interactor::InspectInteractor,
    session_interactor::SessionInteractor,
};
use crate::output::{ArtifactWriter, OverwritePolicy};
use crate::ports::{ConfirmationPort, MediaProbePort, TranscodePort};

pub trait AppContainer: Send + Sync {
    fn generate_interactor(&self, confirm: Arc<dyn ConfirmationPort>, overwrite: OverwritePolicy) -> GenerateInteractor;
    fn inspect_interactor(&self) -> InspectInteractor;
    fn session_interactor(&self) -> SessionInteractor;
}

/// Wires the interactors to their adapters from one resolved configuration
pub struct DefaultAppContainer {
    config: AppConfig,
    probe_port: Arc<dyn MediaProbePort>,
    engine: Arc<dyn TranscodePort>,
}

impl DefaultAppContainer {
    /// Container backed by the external ffmpeg and ffprobe binaries
    pub fn new(config: AppConfig) -> Self {
        let probe_port = Arc::new(FFprobeAdapter::new(config.engine.ffprobe_path.clone()));
        let engine = Arc::new(FFmpegEngine::new(config.engine.ffmpeg_path.clone()));
        Self::with_ports(config, probe_port, engine)
    }

    /// Container with caller-provided ports
    pub fn with_ports(
        config: AppConfig,
        probe_port: Arc<dyn MediaProbePort>,
        engine: Arc<dyn TranscodePort>,
    ) -> Self {
        Self {
            config,
            probe_port,
            engine,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl AppContainer for DefaultAppContainer {
    fn generate_interactor(&self, confirm: Arc<dyn ConfirmationPort>, overwrite: OverwritePolicy) -> GenerateInteractor {
        GenerateInteractor::new(
            Arc::clone(&self.probe_port),
            Arc::clone(&self.engine),
            confirm,
            ArtifactWriter::new(self.config.output.directory.clone(), overwrite),
            self.config.generation,
            self.config.limits,
            self.config.crop,
        )
    }

    fn inspect_interactor(&self) -> InspectInteractor {
        InspectInteractor::new(Arc::clone(&self.probe_port), self.config.limits, self.config.crop)
    }

    fn session_interactor(&self) -> SessionInteractor {
        SessionInteractor::new(self.config.crop)
    }
}
