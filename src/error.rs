//! Error types for the casualty generator

use thiserror::Error;

/// Result type for core operations
pub type SimResult<T> = Result<T, SimError>;

/// Comprehensive error taxonomy for the casualty-generation pipeline
#[derive(Error, Debug)]
pub enum SimError {
    /// Malformed JobRequest, rejected pre-admission; no job is created
    #[error("validation error: {0}")]
    Validation(String),

    /// A required reference-data entry is missing at run time
    #[error("configuration error: {0}")]
    Configuration(String),

    /// C2 could not produce a valid schedule
    #[error("schedule build error: {0}")]
    ScheduleBuild(String),

    /// C3/C4/C5 internal invariant violation
    #[error("generation error: {0}")]
    Generation(String),

    /// C6 could not advance the output stream
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Runner observed a memory/CPU/wall-clock breach
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// User-initiated cancellation; not a failure
    #[error("job cancelled")]
    Cancelled,

    /// Control-plane query referenced an unknown job
    #[error("job {0} not found")]
    NotFound(String),

    /// Control-plane query on output that doesn't exist yet
    #[error("job {0} not ready")]
    NotReady(String),

    /// Invalid job state transition
    #[error("invalid job state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Persistent job store error
    #[error("state persistence error: {0}")]
    StatePersistence(String),

    /// Internal invariant break that isn't attributable to a specific stage
    #[error("internal error: {0}")]
    Internal(String),
}

/// Output-writer error subkinds
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("compression error: {0}")]
    Compression(String),

    #[error("encryption error: {0}")]
    Encryption(String),
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Output(OutputError::Io(err.to_string()))
    }
}

impl From<std::io::Error> for OutputError {
    fn from(err: std::io::Error) -> Self {
        OutputError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for OutputError {
    fn from(err: serde_json::Error) -> Self {
        OutputError::Serialization(err.to_string())
    }
}

impl SimError {
    /// Whether this error should surface as a pre-admission rejection
    /// rather than a terminal job state.
    pub fn is_pre_admission(&self) -> bool {
        matches!(self, SimError::Validation(_))
    }

    /// Sanitized message safe to persist/expose: never includes key material
    /// or private filesystem paths.
    pub fn sanitized_message(&self) -> String {
        match self {
            SimError::Output(OutputError::Encryption(_)) => {
                "encryption error: details withheld".to_string()
            }
            other => other.to_string(),
        }
    }
}
