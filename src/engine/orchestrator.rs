//! Single-job processing orchestrator
//!
//! Owns at most one generation job at a time. Submitting while a job runs
//! cancels the running job first. Every worker message carries the id of the
//! job it belongs to, so messages from a superseded or cancelled worker are
//! dropped instead of being applied to the current job.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, trace, warn};

use crate::domain::errors::DomainError;
use crate::domain::model::GenerateRequest;
use crate::engine::protocol::{ErrorStage, JobId, WorkerEnvelope, WorkerMessage, WorkerRequest};
use crate::engine::worker::WorkerHandle;
use crate::ports::TranscodePort;

/// Lifecycle of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Cancelled,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Cancelled | JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// One generation job and everything reported about it so far
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub request: GenerateRequest,
    pub status: JobStatus,
    /// Last reported percentage; not monotonic
    pub progress_percent: f64,
    /// Present only once the job succeeded
    pub output: Option<Vec<u8>>,
    pub error: Option<DomainError>,
}

impl Job {
    fn new(id: JobId, request: GenerateRequest) -> Self {
        Self {
            id,
            request,
            status: JobStatus::Pending,
            progress_percent: 0.0,
            output: None,
            error: None,
        }
    }
}

/// What a caller observes while a job runs
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress { job: JobId, percent: f64, message: String },
    Succeeded { job: JobId, bytes: usize },
    Failed { job: JobId, error: DomainError },
}

impl JobEvent {
    pub fn job(&self) -> JobId {
        match self {
            JobEvent::Progress { job, .. } | JobEvent::Succeeded { job, .. } | JobEvent::Failed { job, .. } => *job,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobEvent::Progress { .. })
    }
}

/// Result of a submit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub job: JobId,
    /// The running job that was cancelled to make room, if any
    pub superseded: Option<JobId>,
}

/// Runs one transcode job at a time on a background worker.
///
/// Must be used from within a tokio runtime.
pub struct ProcessingOrchestrator {
    engine: Arc<dyn TranscodePort>,
    next_id: u64,
    job: Option<Job>,
    worker: Option<WorkerHandle>,
    outbox: UnboundedSender<WorkerEnvelope>,
    inbox: UnboundedReceiver<WorkerEnvelope>,
    pending: VecDeque<JobEvent>,
}

impl ProcessingOrchestrator {
    pub fn new(engine: Arc<dyn TranscodePort>) -> Self {
        let (outbox, inbox) = mpsc::unbounded_channel();
        Self {
            engine,
            next_id: 1,
            job: None,
            worker: None,
            outbox,
            inbox,
            pending: VecDeque::new(),
        }
    }

    /// Start a job for `request`, cancelling any job still running.
    ///
    /// Invalid requests are rejected before any job is created and leave
    /// the current job untouched.
    pub fn submit(&mut self, request: GenerateRequest) -> Result<SubmitReceipt, DomainError> {
        request.validate()?;

        let superseded = self.cancel();
        if let Some(previous) = superseded {
            info!("Superseding {}", previous);
        }

        let id = JobId(self.next_id);
        self.next_id += 1;

        let mut job = Job::new(id, request.clone());
        info!(
            "Submitting {}: start={:.3}s crop={}x{}+{}+{} fps={} size={}",
            id,
            request.start_time,
            request.crop.size,
            request.crop.size,
            request.crop.x,
            request.crop.y,
            request.fps,
            request.output_size
        );

        let worker = WorkerHandle::spawn(
            id,
            Arc::clone(&self.engine),
            WorkerRequest::Generate { request },
            self.outbox.clone(),
        );
        job.status = JobStatus::Running;

        self.worker = Some(worker);
        self.job = Some(job);
        Ok(SubmitReceipt { job: id, superseded })
    }

    /// Wait for the next event of the current job.
    ///
    /// Returns `None` once the current job has reached a terminal state and
    /// all of its events were delivered, or when there is no job at all.
    pub async fn next_event(&mut self) -> Option<JobEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            let running = matches!(&self.job, Some(job) if job.status == JobStatus::Running);
            if !running {
                return None;
            }
            let worker = self.worker.as_mut()?;

            if worker.has_exited() {
                self.drain_inbox();
                self.fail_lost_worker();
                continue;
            }

            tokio::select! {
                biased;
                Some(envelope) = self.inbox.recv() => self.dispatch(envelope),
                joined = worker.exited() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("Worker panicked: {}", e);
                        }
                    }
                    self.drain_inbox();
                    self.fail_lost_worker();
                }
            }
        }
    }

    /// Cancel the running job. A no-op that returns `None` when nothing runs.
    pub fn cancel(&mut self) -> Option<JobId> {
        let job = self.job.as_mut().filter(|job| !job.status.is_terminal())?;

        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        job.status = JobStatus::Cancelled;
        job.error = Some(DomainError::Cancelled);
        self.pending.clear();

        info!("Cancelled {} at {:.1}%", job.id, job.progress_percent);
        Some(job.id)
    }

    /// Return to the initial state, cancelling anything in flight. Idempotent.
    pub fn reset(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
        if let Some(job) = self.job.take() {
            debug!("Reset discarded {} ({:?})", job.id, job.status);
        }
        self.pending.clear();
        self.drain_inbox();
    }

    pub fn current_job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.job.as_ref().map_or(false, |job| !job.status.is_terminal())
    }

    /// Take the output of a succeeded job, leaving `None` behind
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.job
            .as_mut()
            .filter(|job| job.status == JobStatus::Succeeded)
            .and_then(|job| job.output.take())
    }

    fn drain_inbox(&mut self) {
        while let Ok(envelope) = self.inbox.try_recv() {
            self.dispatch(envelope);
        }
    }

    /// Apply one worker message to the current job
    fn dispatch(&mut self, envelope: WorkerEnvelope) {
        let job = match self.job.as_mut() {
            Some(job) if job.id == envelope.job && job.status == JobStatus::Running => job,
            _ => {
                trace!("Dropping stale message from {}", envelope.job);
                return;
            }
        };

        match envelope.message {
            WorkerMessage::Progress { percent, message } => {
                job.progress_percent = percent;
                self.pending.push_back(JobEvent::Progress {
                    job: job.id,
                    percent,
                    message,
                });
            }
            WorkerMessage::Complete { payload } => {
                if job.progress_percent != 100.0 {
                    job.progress_percent = 100.0;
                    self.pending.push_back(JobEvent::Progress {
                        job: job.id,
                        percent: 100.0,
                        message: "Complete!".to_string(),
                    });
                }
                let bytes = payload.len();
                job.status = JobStatus::Succeeded;
                job.output = Some(payload);
                info!("{} succeeded with {} bytes", job.id, bytes);
                self.pending.push_back(JobEvent::Succeeded { job: job.id, bytes });
                self.worker = None;
            }
            WorkerMessage::Error { message, stage } => {
                let error = match stage {
                    ErrorStage::Load => DomainError::EngineLoadFailure(message),
                    ErrorStage::Execution => DomainError::EngineExecutionFailure(message),
                };
                warn!("{} failed: {}", job.id, error);
                job.status = JobStatus::Failed;
                job.error = Some(error.clone());
                self.pending.push_back(JobEvent::Failed { job: job.id, error });
                self.worker = None;
            }
        }
    }

    /// The worker ended without posting a terminal message
    fn fail_lost_worker(&mut self) {
        let Some(job) = self.job.as_mut().filter(|job| job.status == JobStatus::Running) else {
            return;
        };
        let error = DomainError::EngineExecutionFailure("Worker stopped without producing a result".to_string());
        error!("{}: {}", job.id, error);
        job.status = JobStatus::Failed;
        job.error = Some(error.clone());
        self.pending.push_back(JobEvent::Failed { job: job.id, error });
        self.worker = None;
    }
}

impl Drop for ProcessingOrchestrator {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.terminate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{GenerationPolicy, SourceCropParams};
    use crate::ports::{EngineSignal, TranscodeRequest};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine that finishes immediately, or never when `hang` is set
    struct FakeEngine {
        hang: bool,
        fail_with: Option<String>,
        started: AtomicUsize,
    }

    impl FakeEngine {
        fn quick() -> Arc<Self> {
            Arc::new(Self {
                hang: false,
                fail_with: None,
                started: AtomicUsize::new(0),
            })
        }

        fn hanging() -> Arc<Self> {
            Arc::new(Self {
                hang: true,
                fail_with: None,
                started: AtomicUsize::new(0),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                hang: false,
                fail_with: Some(message.to_string()),
                started: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TranscodePort for FakeEngine {
        async fn load(&self) -> Result<(), DomainError> {
            Ok(())
        }

        async fn transcode(
            &self,
            _request: &TranscodeRequest,
            signals: UnboundedSender<EngineSignal>,
        ) -> Result<Vec<u8>, DomainError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let _ = signals.send(EngineSignal::Fraction(0.5));
            if self.hang {
                std::future::pending::<()>().await;
            }
            match &self.fail_with {
                Some(message) => Err(DomainError::EngineExecutionFailure(message.clone())),
                None => Ok(b"GIF89a-bytes".to_vec()),
            }
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(
            PathBuf::from("clip.mp4"),
            0.0,
            SourceCropParams::new(720, 405, 432),
            GenerationPolicy::default(),
        )
    }

    async fn drain(orchestrator: &mut ProcessingOrchestrator) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = orchestrator.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_successful_job_ends_with_full_progress() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::quick());
        let receipt = orchestrator.submit(request()).unwrap();
        assert_eq!(receipt.superseded, None);
        assert!(orchestrator.is_busy());

        let events = drain(&mut orchestrator).await;
        let (last, rest) = events.split_last().unwrap();
        assert_eq!(last, &JobEvent::Succeeded { job: receipt.job, bytes: 12 });
        assert!(matches!(
            rest.last(),
            Some(JobEvent::Progress { percent, .. }) if *percent == 100.0
        ));
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

        let job = orchestrator.current_job().unwrap();
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.progress_percent, 100.0);
        assert_eq!(orchestrator.take_output(), Some(b"GIF89a-bytes".to_vec()));
        assert_eq!(orchestrator.take_output(), None);
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_once_without_output() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::failing("Conversion failed!"));
        let receipt = orchestrator.submit(request()).unwrap();

        let events = drain(&mut orchestrator).await;
        assert_eq!(
            events.last(),
            Some(&JobEvent::Failed {
                job: receipt.job,
                error: DomainError::EngineExecutionFailure("Conversion failed!".to_string())
            })
        );
        assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
        assert_eq!(orchestrator.current_job().unwrap().status, JobStatus::Failed);
        assert_eq!(orchestrator.take_output(), None);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_without_a_job() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::quick());
        let mut bad = request();
        bad.crop.size = 0;

        let err = orchestrator.submit(bad).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(orchestrator.current_job().is_none());
        assert!(orchestrator.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_when_idle_is_a_no_op() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::quick());
        assert_eq!(orchestrator.cancel(), None);
        orchestrator.reset();
        orchestrator.reset();
        assert!(orchestrator.current_job().is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_a_running_job() {
        let engine = FakeEngine::hanging();
        let mut orchestrator = ProcessingOrchestrator::new(engine.clone());
        let receipt = orchestrator.submit(request()).unwrap();

        // Wait until the transcode is in flight.
        while let Some(event) = orchestrator.next_event().await {
            if matches!(event, JobEvent::Progress { percent, .. } if percent == 60.0) {
                break;
            }
        }
        assert_eq!(engine.started.load(Ordering::SeqCst), 1);

        assert_eq!(orchestrator.cancel(), Some(receipt.job));
        let job = orchestrator.current_job().unwrap();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert_eq!(job.error, Some(DomainError::Cancelled));
        assert!(orchestrator.next_event().await.is_none());
        assert_eq!(orchestrator.cancel(), None);
    }

    #[tokio::test]
    async fn test_submit_supersedes_running_job() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::hanging());
        let first = orchestrator.submit(request()).unwrap();
        let second = orchestrator.submit(request()).unwrap();

        assert_ne!(first.job, second.job);
        assert_eq!(second.superseded, Some(first.job));

        // The second job hangs, so collect whatever arrives within a short window.
        let mut events = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(100), orchestrator.next_event()).await {
            events.push(event);
        }
        assert!(!events.is_empty());
        assert!(events.iter().all(|e| e.job() == second.job));
        assert_eq!(orchestrator.current_job().unwrap().id, second.job);
        assert_eq!(orchestrator.current_job().unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_stale_messages_are_ignored() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::hanging());
        let receipt = orchestrator.submit(request()).unwrap();

        orchestrator
            .outbox
            .send(WorkerEnvelope::new(
                JobId(receipt.job.0 + 40),
                WorkerMessage::Complete { payload: vec![1, 2, 3] },
            ))
            .unwrap();

        let first = orchestrator.next_event().await.unwrap();
        assert_eq!(first.job(), receipt.job);
        assert!(!first.is_terminal());
        assert_eq!(orchestrator.current_job().unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn test_reset_after_success_clears_job() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::quick());
        orchestrator.submit(request()).unwrap();
        drain(&mut orchestrator).await;

        orchestrator.reset();
        assert!(orchestrator.current_job().is_none());
        assert!(!orchestrator.is_busy());
        assert_eq!(orchestrator.take_output(), None);
    }

    #[tokio::test]
    async fn test_completion_without_full_progress_reports_hundred_first() {
        let mut orchestrator = ProcessingOrchestrator::new(FakeEngine::hanging());
        let receipt = orchestrator.submit(request()).unwrap();

        // A worker that completes without ever reporting 100%
        orchestrator
            .outbox
            .send(WorkerEnvelope::new(
                receipt.job,
                WorkerMessage::Complete {
                    payload: b"GIF".to_vec(),
                },
            ))
            .unwrap();

        let events = drain(&mut orchestrator).await;
        let n = events.len();
        assert!(n >= 2);
        assert_eq!(
            events[n - 2],
            JobEvent::Progress {
                job: receipt.job,
                percent: 100.0,
                message: "Complete!".to_string(),
            }
        );
        assert_eq!(events[n - 1], JobEvent::Succeeded { job: receipt.job, bytes: 3 });
        let hundreds = events
            .iter()
            .filter(|e| matches!(e, JobEvent::Progress { percent, .. } if *percent == 100.0))
            .count();
        assert_eq!(hundreds, 1);
        assert_eq!(orchestrator.take_output(), Some(b"GIF".to_vec()));
    }
}
