//! GenerationLog domain type
//!
//! Append-only telemetry row. Exactly one is written per stage invocation,
//! whether it succeeds or fails.

use notestore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::generate_id;

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Topic,
    Plan,
    Article,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Topic => write!(f, "topic"),
            Self::Plan => write!(f, "plan"),
            Self::Article => write!(f, "article"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topic" => Ok(Self::Topic),
            "plan" => Ok(Self::Plan),
            "article" => Ok(Self::Article),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}

/// Persistent record of a single stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationLog {
    /// Unique ID: {hex}-log-{stage}
    pub id: String,

    pub stage: Stage,

    /// Record produced by the invocation; None on failure and for topic batches
    pub reference_id: Option<String>,

    /// Prompt sent to the completion service (empty if never built)
    pub prompt_used: String,

    /// Input plus output tokens
    pub tokens_used: u64,

    /// Wall-clock time of the completion round trip
    pub generation_time_ms: u64,

    pub success: bool,

    pub error_message: Option<String>,

    /// Creation timestamp (milliseconds since Unix epoch)
    pub created_at: i64,

    /// Last update timestamp
    pub updated_at: i64,
}

impl GenerationLog {
    /// Create a new, successful-until-told-otherwise log entry
    pub fn new(stage: Stage) -> Self {
        debug!(%stage, "GenerationLog::new: called");
        let now = now_ms();
        Self {
            id: generate_id("log", &stage.to_string()),
            stage,
            reference_id: None,
            prompt_used: String::new(),
            tokens_used: 0,
            generation_time_ms: 0,
            success: true,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set produced record
    pub fn with_reference(mut self, reference_id: Option<String>) -> Self {
        debug!(%self.id, ?reference_id, "GenerationLog::with_reference");
        self.reference_id = reference_id;
        self
    }

    /// Builder: set prompt text
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt_used = prompt.into();
        debug!(%self.id, prompt_len = self.prompt_used.len(), "GenerationLog::with_prompt");
        self
    }

    /// Builder: set token count
    pub fn with_tokens(mut self, tokens: u64) -> Self {
        debug!(%self.id, tokens, "GenerationLog::with_tokens");
        self.tokens_used = tokens;
        self
    }

    /// Builder: set duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        debug!(%self.id, duration_ms, "GenerationLog::with_duration_ms");
        self.generation_time_ms = duration_ms;
        self
    }

    /// Builder: mark as failed with a message
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_message = Some(message.into());
        debug!(%self.id, error = ?self.error_message, "GenerationLog::with_error");
        self
    }
}

impl Record for GenerationLog {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "generation_logs"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("stage".to_string(), IndexValue::String(self.stage.to_string()));
        if let Some(reference_id) = &self.reference_id {
            fields.insert("reference_id".to_string(), IndexValue::String(reference_id.clone()));
        }
        fields.insert("success".to_string(), IndexValue::Bool(self.success));
        fields.insert("tokens_used".to_string(), IndexValue::Int(self.tokens_used as i64));
        fields.insert("created_at".to_string(), IndexValue::Int(self.created_at));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_log_new() {
        let log = GenerationLog::new(Stage::Plan);
        assert!(log.id.ends_with("-log-plan"));
        assert!(log.success);
        assert!(log.reference_id.is_none());
        assert!(log.error_message.is_none());
    }

    #[test]
    fn test_generation_log_builder() {
        let log = GenerationLog::new(Stage::Article)
            .with_reference(Some("a1".to_string()))
            .with_prompt("prompt")
            .with_tokens(1500)
            .with_duration_ms(3200);

        assert_eq!(log.reference_id.as_deref(), Some("a1"));
        assert_eq!(log.prompt_used, "prompt");
        assert_eq!(log.tokens_used, 1500);
        assert_eq!(log.generation_time_ms, 3200);
        assert!(log.success);
    }

    #[test]
    fn test_with_error_marks_failure() {
        let log = GenerationLog::new(Stage::Topic).with_error("API error 500: boom");
        assert!(!log.success);
        assert_eq!(log.error_message.as_deref(), Some("API error 500: boom"));
    }

    #[test]
    fn test_generation_log_indexed_fields() {
        let log = GenerationLog::new(Stage::Plan).with_tokens(1200).with_error("x");
        let fields = log.indexed_fields();
        assert_eq!(fields.get("tokens_used"), Some(&IndexValue::Int(1200)));
        assert_eq!(fields.get("stage"), Some(&IndexValue::String("plan".to_string())));
        assert_eq!(fields.get("success"), Some(&IndexValue::Bool(false)));
        assert!(!fields.contains_key("reference_id"));
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!("Article".parse::<Stage>().unwrap(), Stage::Article);
        assert!("review".parse::<Stage>().is_err());
    }
}
