//! LLM error types

use thiserror::Error;

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM API key not found. Set the {0} environment variable.")]
    MissingApiKey(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no text content")]
    EmptyResponse,
}

impl LlmError {
    /// HTTP status reported by the service, if the call got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::ApiError { status, .. } => Some(*status),
            LlmError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the service answered but the body was unusable
    pub fn is_malformed(&self) -> bool {
        matches!(self, LlmError::InvalidResponse(_) | LlmError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        let err = LlmError::ApiError {
            status: 529,
            message: "Overloaded".to_string(),
        };
        assert_eq!(err.status(), Some(529));
        assert_eq!(LlmError::EmptyResponse.status(), None);
        assert_eq!(LlmError::MissingApiKey("X".to_string()).status(), None);
    }

    #[test]
    fn test_is_malformed() {
        assert!(LlmError::EmptyResponse.is_malformed());
        assert!(LlmError::InvalidResponse("bad".to_string()).is_malformed());
        assert!(
            !LlmError::ApiError {
                status: 500,
                message: "Server error".to_string()
            }
            .is_malformed()
        );
        assert!(!LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()).is_malformed());
    }

    #[test]
    fn test_display_carries_body() {
        let err = LlmError::ApiError {
            status: 401,
            message: r#"{"error":"invalid x-api-key"}"#.to_string(),
        };
        assert_eq!(err.to_string(), r#"API error 401: {"error":"invalid x-api-key"}"#);
    }
}
