//! Plan stage

use serde::Deserialize;
use tracing::{debug, info};

use super::{Attempt, Pipeline, PipelineError, StageOutput};
use crate::decode::ResponseSchema;
use crate::domain::{ArticlePlan, PlanSection, Stage};

/// Decoded plan-stage reply
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResponse {
    pub title_options: Vec<String>,
    pub lead: String,
    pub structure: Vec<PlanSection>,
    #[serde(deserialize_with = "crate::domain::deserialize_length")]
    pub target_length: u32,
}

impl ResponseSchema for PlanResponse {
    fn validate(&self) -> Result<(), String> {
        if self.title_options.is_empty() {
            return Err("titleOptions is empty".to_string());
        }
        if self.title_options.iter().any(|t| t.trim().is_empty()) {
            return Err("titleOptions contains a blank title".to_string());
        }
        if self.lead.trim().is_empty() {
            return Err("lead is empty".to_string());
        }
        if self.structure.is_empty() {
            return Err("structure has no sections".to_string());
        }
        if let Some(idx) = self.structure.iter().position(|s| s.heading.trim().is_empty()) {
            return Err(format!("section {} has an empty heading", idx + 1));
        }
        if self.target_length == 0 {
            return Err("targetLength must be positive".to_string());
        }
        Ok(())
    }
}

impl Pipeline {
    /// Generate an outline for one topic
    ///
    /// Inserts a draft plan with the first title selected and marks the
    /// topic used, in one commit.
    pub async fn generate_plan(&self, topic_id: &str) -> Result<StageOutput<ArticlePlan>, PipelineError> {
        info!(%topic_id, "generate_plan: starting");
        let mut attempt = Attempt::new(Stage::Plan);
        let result = self.run_plan(&mut attempt, topic_id).await;
        let reference_id = result.as_ref().ok().map(|o| o.record.id.clone());
        self.record_attempt(attempt, &result, reference_id).await;
        result
    }

    async fn run_plan(&self, attempt: &mut Attempt, topic_id: &str) -> Result<StageOutput<ArticlePlan>, PipelineError> {
        let topic = self
            .state
            .get_topic(topic_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Topic not found: {}", topic_id)))?;
        debug!(topic_id = %topic.id, status = %topic.status, "run_plan: loaded topic");

        let prompt = self
            .prompts
            .plan_prompt(&topic)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let response: PlanResponse = self.invoke(attempt, prompt, self.config.plan_max_tokens).await?;

        let plan = ArticlePlan::new(
            Some(topic.id),
            response.title_options,
            response.lead,
            response.structure,
            response.target_length,
        );
        self.state.commit_plan(plan.clone()).await?;

        Ok(attempt.output(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{DecodeError, decode_validated};
    use crate::domain::{PlanStatus, Topic, TopicCategory, TopicStatus};
    use crate::llm::LlmError;
    use crate::llm::client::mock::MockLlmClient;
    use crate::pipeline::test_support::pipeline;

    const REPLY: &str = r#"```json
{
  "titleOptions": ["議事録は5分で終わる", "会議後の30分を取り戻す", "AI議事録入門"],
  "lead": "会議のたびに議事録に追われていませんか。",
  "structure": [
    {"heading": "なぜ議事録は負担になるのか", "content": "現状の課題", "estimatedLength": 800},
    {"heading": "導入ステップ", "content": "3つの手順", "estimatedLength": 1500}
  ],
  "targetLength": 4000
}
```"#;

    #[test]
    fn test_plan_response_validation() {
        let response: PlanResponse = decode_validated(REPLY).unwrap();
        assert_eq!(response.title_options.len(), 3);
        assert_eq!(response.structure[1].estimated_length, Some(1500));

        let empty_titles = r#"{"titleOptions": [], "lead": "l", "structure": [{"heading": "h", "content": "c"}], "targetLength": 100}"#;
        assert!(matches!(
            decode_validated::<PlanResponse>(empty_titles).unwrap_err(),
            DecodeError::Invalid(_)
        ));

        let no_sections = r#"{"titleOptions": ["t"], "lead": "l", "structure": [], "targetLength": 100}"#;
        assert!(matches!(
            decode_validated::<PlanResponse>(no_sections).unwrap_err(),
            DecodeError::Invalid(_)
        ));

        let blank_lead = r#"{"titleOptions": ["t"], "lead": " ", "structure": [{"heading": "h", "content": "c"}], "targetLength": 100}"#;
        assert!(matches!(
            decode_validated::<PlanResponse>(blank_lead).unwrap_err(),
            DecodeError::Invalid(_)
        ));

        let missing_lead = r#"{"titleOptions": ["t"], "structure": [{"heading": "h", "content": "c"}], "targetLength": 100}"#;
        assert!(matches!(
            decode_validated::<PlanResponse>(missing_lead).unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[test]
    fn test_plan_response_accepts_loose_lengths() {
        let text = r#"{
          "titleOptions": ["t"],
          "lead": "l",
          "structure": [
            {"heading": "a", "content": "x", "estimatedLength": 800.0},
            {"heading": "b", "content": "y", "estimatedLength": "1200"},
            {"heading": "c", "content": "z", "estimatedLength": "長め"}
          ],
          "targetLength": "3500"
        }"#;
        let response: PlanResponse = decode_validated(text).unwrap();
        let hints: Vec<Option<u32>> = response.structure.iter().map(|s| s.estimated_length).collect();
        assert_eq!(hints, vec![Some(800), Some(1200), None]);
        assert_eq!(response.target_length, 3500);

        let unusable_target = r#"{"titleOptions": ["t"], "lead": "l", "structure": [{"heading": "h", "content": "c"}], "targetLength": "未定"}"#;
        assert!(matches!(
            decode_validated::<PlanResponse>(unusable_target).unwrap_err(),
            DecodeError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_generate_plan_store_unavailable() {
        let (pipeline, llm) = pipeline(MockLlmClient::replying(REPLY));
        pipeline.state().shutdown().await.unwrap();

        let err = pipeline.generate_plan("t1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert_eq!(err.status_code(), 500);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_plan_selects_first_title_and_uses_topic() {
        let (pipeline, llm) = pipeline(MockLlmClient::replying(REPLY));
        let topic = Topic::new("生成AIで議事録作成を自動化", TopicCategory::BusinessEfficiency);
        pipeline.state().create_topics(vec![topic.clone()]).await.unwrap();

        let output = pipeline.generate_plan(&topic.id).await.unwrap();
        let plan = output.record;
        assert_eq!(plan.selected_title.as_deref(), Some("議事録は5分で終わる"));
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.topic_id.as_deref(), Some(topic.id.as_str()));
        assert_eq!(plan.target_length, 4000);
        assert!(llm.prompts()[0].contains("- トピック: 生成AIで議事録作成を自動化"));

        let topic = pipeline.state().get_topic(&topic.id).await.unwrap().unwrap();
        assert_eq!(topic.status, TopicStatus::Used);

        let logs = pipeline.state().list_logs(Some(Stage::Plan), 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].success);
        assert_eq!(logs[0].reference_id.as_deref(), Some(plan.id.as_str()));
    }

    #[tokio::test]
    async fn test_generate_plan_missing_topic() {
        let (pipeline, llm) = pipeline(MockLlmClient::replying(REPLY));

        let err = pipeline.generate_plan("nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound(_)));
        assert_eq!(err.status_code(), 404);
        assert_eq!(llm.call_count(), 0);
        assert!(pipeline.state().list_plans(None).await.unwrap().is_empty());

        let logs = pipeline.state().list_logs(None, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].stage, Stage::Plan);
        assert!(!logs[0].success);
        assert!(logs[0].reference_id.is_none());
    }

    #[tokio::test]
    async fn test_generate_plan_service_error_leaves_topic_available() {
        let (pipeline, _) = pipeline(MockLlmClient::new(vec![Err(LlmError::ApiError {
            status: 529,
            message: "overloaded".to_string(),
        })]));
        let topic = Topic::new("t", TopicCategory::Creative);
        pipeline.state().create_topics(vec![topic.clone()]).await.unwrap();

        let err = pipeline.generate_plan(&topic.id).await.unwrap_err();
        assert!(matches!(err, PipelineError::Service { status: Some(529), .. }));

        let topic = pipeline.state().get_topic(&topic.id).await.unwrap().unwrap();
        assert_eq!(topic.status, TopicStatus::Available);
        let logs = pipeline.state().list_logs(None, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].error_message.as_deref().unwrap_or_default().contains("overloaded"));
    }
}
