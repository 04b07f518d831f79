//! Background worker that drives the transcoding engine for one job

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

use crate::engine::progress::ProgressEstimator;
use crate::engine::protocol::{JobId, WorkerEnvelope, WorkerMessage, WorkerRequest};
use crate::ports::{EngineSignal, TranscodePort, TranscodeRequest};

/// Owns the task running one job.
///
/// Dropping the handle aborts the task, which drops the engine future and
/// with it any child process the engine started.
pub struct WorkerHandle {
    job: JobId,
    task: JoinHandle<()>,
    exited: bool,
}

impl WorkerHandle {
    /// Start a worker for `request`; every message it posts is tagged with `job`
    pub fn spawn(
        job: JobId,
        engine: Arc<dyn TranscodePort>,
        request: WorkerRequest,
        outbox: UnboundedSender<WorkerEnvelope>,
    ) -> Self {
        let task = tokio::spawn(async move {
            match request {
                WorkerRequest::Generate { request } => {
                    let estimator = ProgressEstimator::new(request.policy());
                    let request = TranscodeRequest::from(&request);
                    run_generate(job, engine.as_ref(), &request, &estimator, &outbox).await;
                }
            }
        });

        debug!("Spawned worker for {}", job);
        Self { job, task, exited: false }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// Whether the task has been observed to exit
    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Wait for the task to end. Resolves at most once per handle.
    pub async fn exited(&mut self) -> Result<(), JoinError> {
        let result = (&mut self.task).await;
        self.exited = true;
        result
    }

    /// Stop the worker and release it
    pub fn terminate(self) {
        debug!("Terminating worker for {}", self.job);
        drop(self);
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn post(outbox: &UnboundedSender<WorkerEnvelope>, job: JobId, message: WorkerMessage) {
    // The orchestrator owns the receiving side; a closed channel means it is gone.
    if outbox.send(WorkerEnvelope::new(job, message)).is_err() {
        debug!("Orchestrator dropped, discarding message for {}", job);
    }
}

async fn run_generate(
    job: JobId,
    engine: &dyn TranscodePort,
    request: &TranscodeRequest,
    estimator: &ProgressEstimator,
    outbox: &UnboundedSender<WorkerEnvelope>,
) {
    post(outbox, job, WorkerMessage::progress(10.0, "Loading FFmpeg..."));
    if let Err(e) = engine.load().await {
        warn!("Engine failed to load for {}: {}", job, e);
        post(outbox, job, WorkerMessage::from_error(&e));
        return;
    }

    post(outbox, job, WorkerMessage::progress(25.0, "Preparing video data..."));
    post(outbox, job, WorkerMessage::progress(30.0, "Starting GIF generation..."));

    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<EngineSignal>();
    let transcode = engine.transcode(request, signal_tx);
    tokio::pin!(transcode);

    let result = loop {
        tokio::select! {
            Some(signal) = signal_rx.recv() => {
                if let Some(update) = estimator.estimate(&signal) {
                    post(outbox, job, WorkerMessage::progress(update.percent, update.message));
                }
            }
            result = &mut transcode => break result,
        }
    };

    while let Ok(signal) = signal_rx.try_recv() {
        if let Some(update) = estimator.estimate(&signal) {
            post(outbox, job, WorkerMessage::progress(update.percent, update.message));
        }
    }

    match result {
        Ok(payload) => {
            post(outbox, job, WorkerMessage::progress(95.0, "Finalizing GIF..."));
            post(outbox, job, WorkerMessage::progress(100.0, "Complete!"));
            post(outbox, job, WorkerMessage::Complete { payload });
        }
        Err(e) => {
            warn!("Transcode failed for {}: {}", job, e);
            post(outbox, job, WorkerMessage::from_error(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::model::{GenerateRequest, GenerationPolicy, SourceCropParams};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct ScriptedEngine {
        load_error: Option<String>,
        signals: Vec<EngineSignal>,
        outcome: Result<Vec<u8>, DomainError>,
    }

    #[async_trait]
    impl TranscodePort for ScriptedEngine {
        async fn load(&self) -> Result<(), DomainError> {
            match &self.load_error {
                Some(reason) => Err(DomainError::EngineLoadFailure(reason.clone())),
                None => Ok(()),
            }
        }

        async fn transcode(
            &self,
            _request: &TranscodeRequest,
            signals: UnboundedSender<EngineSignal>,
        ) -> Result<Vec<u8>, DomainError> {
            for signal in &self.signals {
                let _ = signals.send(signal.clone());
            }
            self.outcome.clone()
        }
    }

    fn request() -> WorkerRequest {
        WorkerRequest::Generate {
            request: GenerateRequest::new(
                PathBuf::from("clip.mp4"),
                1.0,
                SourceCropParams::new(720, 405, 432),
                GenerationPolicy::default(),
            ),
        }
    }

    async fn collect(mut rx: UnboundedReceiver<WorkerEnvelope>) -> Vec<WorkerMessage> {
        let mut messages = Vec::new();
        while let Some(envelope) = rx.recv().await {
            assert_eq!(envelope.job, JobId(3));
            let terminal = envelope.message.is_terminal();
            messages.push(envelope.message);
            if terminal {
                break;
            }
        }
        messages
    }

    fn percents(messages: &[WorkerMessage]) -> Vec<f64> {
        messages
            .iter()
            .filter_map(|m| match m {
                WorkerMessage::Progress { percent, .. } => Some(*percent),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_successful_run_reports_stages_in_order() {
        let engine = Arc::new(ScriptedEngine {
            load_error: None,
            signals: vec![
                EngineSignal::Fraction(0.5),
                EngineSignal::Log("frame=   20 fps=0.0".to_string()),
                EngineSignal::Log("Output #0, gif".to_string()),
            ],
            outcome: Ok(b"GIF89a".to_vec()),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let _worker = WorkerHandle::spawn(JobId(3), engine, request(), tx);

        let messages = collect(rx).await;
        assert_eq!(percents(&messages), vec![10.0, 25.0, 30.0, 60.0, 60.0, 95.0, 100.0]);
        assert_eq!(
            messages.last(),
            Some(&WorkerMessage::Complete {
                payload: b"GIF89a".to_vec()
            })
        );
    }

    #[tokio::test]
    async fn test_load_failure_stops_before_transcode() {
        let engine = Arc::new(ScriptedEngine {
            load_error: Some("Failed to load FFmpeg: not installed".to_string()),
            signals: vec![EngineSignal::Fraction(0.5)],
            outcome: Ok(b"GIF89a".to_vec()),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let _worker = WorkerHandle::spawn(JobId(3), engine, request(), tx);

        let messages = collect(rx).await;
        assert_eq!(percents(&messages), vec![10.0]);
        assert!(matches!(
            messages.last(),
            Some(WorkerMessage::Error { message, stage: crate::engine::protocol::ErrorStage::Load })
                if message == "Failed to load FFmpeg: not installed"
        ));
    }

    #[tokio::test]
    async fn test_engine_error_is_forwarded_verbatim() {
        let engine = Arc::new(ScriptedEngine {
            load_error: None,
            signals: vec![],
            outcome: Err(DomainError::EngineExecutionFailure(
                "clip.mp4: Invalid data found when processing input".to_string(),
            )),
        });
        let (tx, rx) = mpsc::unbounded_channel();
        let _worker = WorkerHandle::spawn(JobId(3), engine, request(), tx);

        let messages = collect(rx).await;
        assert!(!percents(&messages).contains(&100.0));
        assert!(matches!(
            messages.last(),
            Some(WorkerMessage::Error { message, .. })
                if message == "clip.mp4: Invalid data found when processing input"
        ));
    }
}
