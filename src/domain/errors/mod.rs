// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Unsupported media, malformed request, or a crop that violates its invariants
    InvalidInput(String),
    /// Oversized file or overlong media; advisory, the user may proceed
    ResourceLimit(String),
    /// The transcoding engine could not be initialized
    EngineLoadFailure(String),
    /// The transcode call itself failed
    EngineExecutionFailure(String),
    /// User-initiated cancellation; a clean terminal state, not a failure
    Cancelled,
    /// Media metadata could not be read
    ProbeFailure(String),
    /// File system error
    FsFailure(String),
}

impl DomainError {
    /// Whether this error should be reported to the user as a failure
    pub fn is_failure(&self) -> bool {
        !matches!(self, DomainError::Cancelled | DomainError::ResourceLimit(_))
    }

    /// The underlying message, without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            DomainError::InvalidInput(msg)
            | DomainError::ResourceLimit(msg)
            | DomainError::EngineLoadFailure(msg)
            | DomainError::EngineExecutionFailure(msg)
            | DomainError::ProbeFailure(msg)
            | DomainError::FsFailure(msg) => msg,
            DomainError::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::ResourceLimit(msg) => write!(f, "Resource limit: {}", msg),
            DomainError::EngineLoadFailure(msg) => write!(f, "{}", msg),
            DomainError::EngineExecutionFailure(msg) => write!(f, "{}", msg),
            DomainError::Cancelled => write!(f, "Generation cancelled"),
            DomainError::ProbeFailure(msg) => write!(f, "Cannot read video metadata: {}", msg),
            DomainError::FsFailure(msg) => write!(f, "File system error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFailure(err.to_string())
    }
}
