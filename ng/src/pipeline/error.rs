//! Stage orchestrator errors

use thiserror::Error;

use crate::decode::DecodeError;
use crate::llm::LlmError;
use crate::state::StateError;

/// Why a stage invocation failed
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Credential missing or a prompt template unusable
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller input rejected before prompting
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Referenced topic or plan does not exist
    #[error("{0}")]
    NotFound(String),

    /// Transport failure or non-success status from the completion service
    #[error("Completion service error: {message}")]
    Service { status: Option<u16>, message: String },

    /// Completion text did not decode into the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The store rejected a read or write
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// HTTP-style status for the invocation surface
    pub fn status_code(&self) -> u16 {
        match self {
            PipelineError::InvalidRequest(_) => 400,
            PipelineError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

impl From<LlmError> for PipelineError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey(_) => PipelineError::Configuration(e.to_string()),
            e if e.is_malformed() => PipelineError::MalformedResponse(e.to_string()),
            e => PipelineError::Service {
                status: e.status(),
                message: e.to_string(),
            },
        }
    }
}

impl From<DecodeError> for PipelineError {
    fn from(e: DecodeError) -> Self {
        PipelineError::MalformedResponse(e.to_string())
    }
}

impl From<StateError> for PipelineError {
    fn from(e: StateError) -> Self {
        PipelineError::Persistence(e.to_string())
    }
}
