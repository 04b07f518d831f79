//! Messages exchanged between the orchestrator and its worker task

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::model::GenerateRequest;

/// Identifier of one generation job; every worker message is tagged with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Orchestrator to worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    Generate { request: GenerateRequest },
}

/// Which phase of the worker produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Load,
    #[default]
    Execution,
}

/// Worker to orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    Progress {
        percent: f64,
        message: String,
    },
    Complete {
        payload: Vec<u8>,
    },
    Error {
        message: String,
        #[serde(default)]
        stage: ErrorStage,
    },
}

impl WorkerMessage {
    pub fn progress(percent: f64, message: impl Into<String>) -> Self {
        WorkerMessage::Progress {
            percent,
            message: message.into(),
        }
    }

    /// Build the error message for a failure, keeping its text verbatim
    pub fn from_error(error: &DomainError) -> Self {
        let stage = match error {
            DomainError::EngineLoadFailure(_) => ErrorStage::Load,
            _ => ErrorStage::Execution,
        };
        WorkerMessage::Error {
            message: error.to_string(),
            stage,
        }
    }

    /// Complete and Error end a job; nothing follows them
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkerMessage::Progress { .. })
    }
}

/// A worker message tagged with the job it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerEnvelope {
    pub job: JobId,
    pub message: WorkerMessage,
}

impl WorkerEnvelope {
    pub fn new(job: JobId, message: WorkerMessage) -> Self {
        Self { job, message }
    }
}
