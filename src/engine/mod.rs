//! GIF generation engine: job orchestration, worker task and progress

pub mod orchestrator;
pub mod progress;
pub mod protocol;
pub mod worker;

pub use orchestrator::{Job, JobEvent, JobStatus, ProcessingOrchestrator, SubmitReceipt};
pub use progress::{
    ConsoleProgressCallback, JsonProgressCallback, NoOpProgressCallback, ProgressCallback, ProgressEstimator,
    ProgressUpdate,
};
pub use protocol::{ErrorStage, JobId, WorkerEnvelope, WorkerMessage, WorkerRequest};
pub use worker::WorkerHandle;
