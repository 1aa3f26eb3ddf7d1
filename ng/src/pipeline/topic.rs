//! Topic stage

use serde::Deserialize;
use tracing::{debug, info};

use super::{Attempt, Pipeline, PipelineError, StageOutput};
use crate::decode::ResponseSchema;
use crate::domain::{Stage, Topic, TopicCategory};

/// Separators the model uses when it returns keywords as one string
const KEYWORD_SEPARATORS: [char; 3] = [',', '、', '，'];

/// Keywords arrive either as a list or as one delimited string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Keywords {
    List(Vec<String>),
    Joined(String),
}

impl Keywords {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Keywords::List(list) => list,
            Keywords::Joined(joined) => joined.split(KEYWORD_SEPARATORS).map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// One topic as the model describes it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCandidate {
    pub name: String,
    pub category: TopicCategory,
    pub priority: i64,
    #[serde(default = "no_keywords")]
    keywords: Keywords,
    pub target_audience: String,
    pub angle: String,
}

fn no_keywords() -> Keywords {
    Keywords::List(Vec::new())
}

impl TopicCandidate {
    pub fn keywords(&self) -> Vec<String> {
        self.keywords.clone().into_vec()
    }

    /// Turn the candidate into a new available Topic
    pub fn into_topic(self) -> Topic {
        let keywords = self.keywords.into_vec();
        Topic::new(self.name.trim(), self.category)
            .with_priority(self.priority)
            .with_keywords(keywords)
            .with_target_audience(self.target_audience)
            .with_angle(self.angle)
    }
}

/// Decoded topic-stage reply
pub type TopicCandidates = Vec<TopicCandidate>;

impl ResponseSchema for Vec<TopicCandidate> {
    fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("no topics in response".to_string());
        }
        for (idx, candidate) in self.iter().enumerate() {
            if candidate.name.trim().is_empty() {
                return Err(format!("topic {} has an empty name", idx + 1));
            }
            if !(1..=10).contains(&candidate.priority) {
                return Err(format!(
                    "topic {} has priority {} outside 1-10",
                    idx + 1,
                    candidate.priority
                ));
            }
        }
        Ok(())
    }
}

impl Pipeline {
    /// Generate `count` topics, optionally restricted to `categories`
    ///
    /// Inserts them as available and logs one topic-stage entry with no
    /// reference id.
    pub async fn generate_topics(
        &self,
        count: u32,
        categories: &[TopicCategory],
    ) -> Result<StageOutput<Vec<Topic>>, PipelineError> {
        info!(count, num_categories = categories.len(), "generate_topics: starting");
        let mut attempt = Attempt::new(Stage::Topic);
        let result = self.run_topics(&mut attempt, count, categories).await;
        self.record_attempt(attempt, &result, None).await;
        result
    }

    async fn run_topics(
        &self,
        attempt: &mut Attempt,
        count: u32,
        categories: &[TopicCategory],
    ) -> Result<StageOutput<Vec<Topic>>, PipelineError> {
        let max = self.config.max_topic_count;
        if count == 0 || count > max {
            return Err(PipelineError::InvalidRequest(format!(
                "count must be between 1 and {}, got {}",
                max, count
            )));
        }

        let prompt = self
            .prompts
            .topic_prompt(count, categories)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let candidates: TopicCandidates = self.invoke(attempt, prompt, self.config.topic_max_tokens).await?;
        debug!(requested = count, received = candidates.len(), "run_topics: decoded candidates");

        let topics: Vec<Topic> = candidates.into_iter().map(TopicCandidate::into_topic).collect();
        self.state.create_topics(topics.clone()).await?;

        Ok(attempt.output(topics))
    }
}
