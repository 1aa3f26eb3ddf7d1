//! Stage orchestrators
//!
//! One linear sequence per stage: load inputs, render the prompt, call the
//! completion service, decode, persist, and write exactly one
//! GenerationLog for the invocation whether it succeeded or not.
//!
//! ```text
//! caller -> Pipeline -> StateManager (read) -> PromptLoader -> LlmClient
//!        -> decode -> StateManager (commit) -> GenerationLog -> StageOutput
//! ```

mod article;
mod error;
mod plan;
mod topic;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

pub use article::{ArticleResponse, ArticleResponseSection, assemble_markdown};
pub use error::PipelineError;
pub use plan::PlanResponse;
pub use topic::{TopicCandidate, TopicCandidates};

use crate::config::PipelineConfig;
use crate::decode::{ResponseSchema, decode_validated};
use crate::domain::{GenerationLog, Stage};
use crate::llm::{CompletionRequest, LlmClient, StopReason};
use crate::prompts::PromptLoader;
use crate::state::StateManager;

/// A stage's product plus the cost of producing it
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    pub record: T,
    /// Input plus output tokens reported by the completion service
    pub tokens: u64,
    /// Wall-clock time of the completion round trip and decode
    pub latency_ms: u64,
}

/// What is known about an invocation so far, for its GenerationLog
#[derive(Debug)]
struct Attempt {
    stage: Stage,
    prompt: String,
    tokens: u64,
    latency_ms: u64,
}

impl Attempt {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            prompt: String::new(),
            tokens: 0,
            latency_ms: 0,
        }
    }

    fn output<T>(&self, record: T) -> StageOutput<T> {
        StageOutput {
            record,
            tokens: self.tokens,
            latency_ms: self.latency_ms,
        }
    }
}

/// Runs the topic, plan, and article stages
#[derive(Clone)]
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    state: StateManager,
    prompts: Arc<PromptLoader>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        state: StateManager,
        prompts: Arc<PromptLoader>,
        config: PipelineConfig,
    ) -> Self {
        debug!(?config, "Pipeline::new: called");
        Self {
            llm,
            state,
            prompts,
            config,
        }
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Call the completion service and decode its text into `T`
    ///
    /// Records tokens and latency on the attempt even when decoding fails.
    async fn invoke<T: ResponseSchema>(
        &self,
        attempt: &mut Attempt,
        prompt: String,
        max_tokens: u32,
    ) -> Result<T, PipelineError> {
        debug!(stage = %attempt.stage, max_tokens, prompt_len = prompt.len(), "invoke: called");
        attempt.prompt = prompt;
        let request = CompletionRequest::from_prompt(attempt.prompt.clone(), max_tokens);

        let started = Instant::now();
        let decoded = match self.llm.complete(request).await {
            Ok(response) => {
                attempt.tokens = response.usage.total();
                if response.stop_reason == StopReason::MaxTokens {
                    warn!(stage = %attempt.stage, max_tokens, "invoke: completion hit the token ceiling");
                }
                decode_validated::<T>(&response.content).map_err(PipelineError::from)
            }
            Err(e) => Err(PipelineError::from(e)),
        };
        attempt.latency_ms = started.elapsed().as_millis() as u64;

        debug!(stage = %attempt.stage, tokens = attempt.tokens, latency_ms = attempt.latency_ms, ok = decoded.is_ok(), "invoke: done");
        decoded
    }

    /// Write the invocation's GenerationLog
    ///
    /// Best-effort: a failed write is logged and never replaces the outcome.
    async fn record_attempt<T>(
        &self,
        attempt: Attempt,
        result: &Result<StageOutput<T>, PipelineError>,
        reference_id: Option<String>,
    ) {
        let stage = attempt.stage;
        let mut log = GenerationLog::new(stage)
            .with_prompt(attempt.prompt)
            .with_tokens(attempt.tokens)
            .with_duration_ms(attempt.latency_ms);

        match result {
            Ok(output) => {
                info!(%stage, tokens = output.tokens, latency_ms = output.latency_ms, ?reference_id, "Stage succeeded");
                log = log.with_reference(reference_id);
            }
            Err(e) => {
                warn!(%stage, error = %e, "Stage failed");
                log = log.with_error(e.to_string());
            }
        }

        if let Err(e) = self.state.append_log(log).await {
            warn!(%stage, error = %e, "Failed to write generation log");
        }
    }
}
