//! Request routing for the invocation surface

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use super::messages::{
    ApiRequest, ApiResponse, CreateTopicBody, GenerateArticleBody, GeneratePlanBody, GenerateTopicsBody, Method,
    UpdateArticleBody, UpdatePlanBody, UpdateTopicBody,
};
use crate::domain::{ArticleStatus, PlanStatus, Stage, Topic, TopicCategory, TopicStatus};
use crate::pipeline::{Pipeline, PipelineError};
use crate::state::{StateError, StateManager};

/// Log listing size when the caller gives none
const DEFAULT_LOG_LIMIT: usize = 50;

/// Route-level failures, rendered as `{"error": ...}`
#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    State(#[from] StateError),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::NotFound(_) => 404,
            ApiError::MethodNotAllowed => 405,
            ApiError::Pipeline(e) => e.status_code(),
            ApiError::State(_) | ApiError::Encode(_) => 500,
        }
    }
}

type ApiResult = Result<ApiResponse, ApiError>;

/// Dispatches requests to the pipeline and the state manager
#[derive(Clone)]
pub struct Api {
    pipeline: Pipeline,
}

impl Api {
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    fn state(&self) -> &StateManager {
        self.pipeline.state()
    }

    /// Handle one request
    pub async fn handle(&self, req: ApiRequest) -> ApiResponse {
        debug!(method = %req.method, path = %req.path, "handle: called");
        let path = req.path.trim_matches('/').to_string();
        let segments: Vec<&str> = path.split('/').collect();

        let result = match (req.method, segments.as_slice()) {
            (Method::Post, ["api", "topics", "generate"]) => self.generate_topics(&req).await,
            (Method::Post, ["api", "plans", "generate"]) => self.generate_plan(&req).await,
            (Method::Post, ["api", "articles", "generate"]) => self.generate_article(&req).await,
            (_, ["api", _, "generate"]) => Err(ApiError::MethodNotAllowed),

            (Method::Get, ["api", "topics"]) => self.list_topics(&req).await,
            (Method::Post, ["api", "topics"]) => self.create_topic(&req).await,
            (Method::Get, ["api", "topics", id]) => self.get_topic(id).await,
            (Method::Patch, ["api", "topics", id]) => self.update_topic(id, &req).await,

            (Method::Get, ["api", "plans"]) => self.list_plans(&req).await,
            (Method::Get, ["api", "plans", id]) => self.get_plan(id).await,
            (Method::Patch, ["api", "plans", id]) => self.update_plan(id, &req).await,

            (Method::Get, ["api", "articles"]) => self.list_articles(&req).await,
            (Method::Get, ["api", "articles", id]) => self.get_article(id).await,
            (Method::Patch, ["api", "articles", id]) => self.update_article(id, &req).await,

            (Method::Get, ["api", "logs"]) => self.list_logs(&req).await,
            (Method::Get, ["api", "stats"]) => self.stats().await,

            (_, ["api", "topics" | "plans" | "articles"])
            | (_, ["api", "topics" | "plans" | "articles", _])
            | (_, ["api", "logs" | "stats"]) => Err(ApiError::MethodNotAllowed),

            _ => Err(ApiError::NotFound("Not found".to_string())),
        };

        match result {
            Ok(resp) => resp,
            Err(e) => {
                let status = e.status();
                if status >= 500 {
                    warn!(method = %req.method, path = %req.path, status, error = %e, "handle: request failed");
                } else {
                    debug!(method = %req.method, path = %req.path, status, error = %e, "handle: request rejected");
                }
                ApiResponse::error(status, e.to_string())
            }
        }
    }

    // === Generation ===

    async fn generate_topics(&self, req: &ApiRequest) -> ApiResult {
        let body: GenerateTopicsBody = parse_body(req)?;
        let count = body.count.unwrap_or(self.pipeline.config().default_topic_count);
        let categories = body
            .categories
            .unwrap_or_default()
            .iter()
            .map(|c| c.parse::<TopicCategory>().map_err(ApiError::BadRequest))
            .collect::<Result<Vec<_>, _>>()?;

        let output = self.pipeline.generate_topics(count, &categories).await?;
        Ok(ApiResponse::ok(json!({
            "topics": output.record,
            "meta": {
                "count": output.record.len(),
                "tokens": output.tokens,
                "generationTime": output.latency_ms,
            },
        })))
    }

    async fn generate_plan(&self, req: &ApiRequest) -> ApiResult {
        let body: GeneratePlanBody = parse_body(req)?;
        let topic_id = required(body.topic_id, "topicId")?;

        let output = self.pipeline.generate_plan(&topic_id).await?;
        Ok(ApiResponse::ok(json!({
            "plan": output.record,
            "meta": {
                "tokens": output.tokens,
                "generationTime": output.latency_ms,
            },
        })))
    }

    async fn generate_article(&self, req: &ApiRequest) -> ApiResult {
        let body: GenerateArticleBody = parse_body(req)?;
        let plan_id = required(body.plan_id, "planId")?;

        let output = self.pipeline.generate_article(&plan_id).await?;
        Ok(ApiResponse::ok(json!({
            "meta": {
                "tokens": output.tokens,
                "generationTime": output.latency_ms,
                "wordCount": output.record.word_count,
            },
            "article": output.record,
        })))
    }

    // === Topics ===

    async fn list_topics(&self, req: &ApiRequest) -> ApiResult {
        let status = parse_param::<TopicStatus>(req, "status")?;
        let category = parse_param::<TopicCategory>(req, "category")?;
        let topics = self.state().list_topics(status, category).await?;
        Ok(ApiResponse::ok(to_json(&topics)?))
    }

    async fn create_topic(&self, req: &ApiRequest) -> ApiResult {
        let body: CreateTopicBody = parse_body(req)?;
        let name = required(body.name, "name")?;
        let category = required(body.category, "category")?
            .parse::<TopicCategory>()
            .map_err(ApiError::BadRequest)?;

        let mut topic = Topic::new(name.trim(), category)
            .with_keywords(body.keywords.unwrap_or_default())
            .with_target_audience(body.target_audience.unwrap_or_default())
            .with_angle(body.angle.unwrap_or_default());
        if let Some(priority) = body.priority {
            topic = topic.with_priority(priority);
        }

        self.state().create_topics(vec![topic.clone()]).await?;
        Ok(ApiResponse::created(to_json(&topic)?))
    }

    async fn get_topic(&self, id: &str) -> ApiResult {
        let topic = self
            .state()
            .get_topic(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Topic not found: {}", id)))?;
        Ok(ApiResponse::ok(to_json(&topic)?))
    }

    async fn update_topic(&self, id: &str, req: &ApiRequest) -> ApiResult {
        let body: UpdateTopicBody = parse_body(req)?;
        let status = required(body.status, "status")?
            .parse::<TopicStatus>()
            .map_err(ApiError::BadRequest)?;

        let mut topic = self
            .state()
            .get_topic(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Topic not found: {}", id)))?;
        topic.set_status(status);
        self.state().update_topic(topic.clone()).await?;
        Ok(ApiResponse::ok(to_json(&topic)?))
    }

    // === Plans ===

    async fn list_plans(&self, req: &ApiRequest) -> ApiResult {
        let status = parse_param::<PlanStatus>(req, "status")?;
        let plans = self.state().list_plans(status).await?;
        Ok(ApiResponse::ok(to_json(&plans)?))
    }

    async fn get_plan(&self, id: &str) -> ApiResult {
        let (plan, topic) = self
            .state()
            .get_plan_with_topic(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Plan not found: {}", id)))?;
        Ok(ApiResponse::ok(json!({ "plan": plan, "topic": topic })))
    }

    async fn update_plan(&self, id: &str, req: &ApiRequest) -> ApiResult {
        let body: UpdatePlanBody = parse_body(req)?;
        let status = body
            .status
            .map(|s| s.parse::<PlanStatus>().map_err(ApiError::BadRequest))
            .transpose()?;

        let mut plan = self
            .state()
            .get_plan(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Plan not found: {}", id)))?;

        if let Some(title) = body.selected_title {
            plan.select_title(&title).map_err(ApiError::BadRequest)?;
        }
        if let Some(notes) = body.notes {
            plan.set_notes(Some(notes).filter(|n| !n.trim().is_empty()));
        }
        if let Some(status) = status {
            plan.set_status(status);
        }

        self.state().update_plan(plan.clone()).await?;
        Ok(ApiResponse::ok(to_json(&plan)?))
    }

    // === Articles ===

    async fn list_articles(&self, req: &ApiRequest) -> ApiResult {
        let status = parse_param::<ArticleStatus>(req, "status")?;
        let articles = self.state().list_articles(status).await?;
        Ok(ApiResponse::ok(to_json(&articles)?))
    }

    async fn get_article(&self, id: &str) -> ApiResult {
        let article = self
            .state()
            .get_article(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Article not found: {}", id)))?;
        Ok(ApiResponse::ok(to_json(&article)?))
    }

    async fn update_article(&self, id: &str, req: &ApiRequest) -> ApiResult {
        let body: UpdateArticleBody = parse_body(req)?;
        let status = body
            .status
            .map(|s| s.parse::<ArticleStatus>().map_err(ApiError::BadRequest))
            .transpose()?;

        let mut article = self
            .state()
            .get_article(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Article not found: {}", id)))?;

        if let Some(title) = body.title {
            if title.trim().is_empty() {
                return Err(ApiError::BadRequest("title must not be empty".to_string()));
            }
            article.set_title(title);
        }
        if let Some(content) = body.content_markdown {
            article.set_content(content);
        }
        if let Some(url) = body.note_url {
            article.set_note_url(Some(url).filter(|u| !u.trim().is_empty()));
        }
        if let Some(status) = status {
            article.set_status(status);
        }

        self.state().update_article(article.clone()).await?;
        Ok(ApiResponse::ok(to_json(&article)?))
    }

    // === Telemetry ===

    async fn list_logs(&self, req: &ApiRequest) -> ApiResult {
        let stage = parse_param::<Stage>(req, "stage")?;
        let limit = match req.query_param("limit") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid limit: {}", raw)))?,
            None => DEFAULT_LOG_LIMIT,
        };
        let logs = self.state().list_logs(stage, limit).await?;
        Ok(ApiResponse::ok(to_json(&logs)?))
    }

    async fn stats(&self) -> ApiResult {
        let stats = self.state().stats().await?;
        Ok(ApiResponse::ok(to_json(&stats)?))
    }
}

/// Decode the JSON body; a missing body decodes as the default
fn parse_body<T: DeserializeOwned + Default>(req: &ApiRequest) -> Result<T, ApiError> {
    match &req.body {
        None | Some(Value::Null) => Ok(T::default()),
        Some(body) => serde_json::from_value(body.clone())
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e))),
    }
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}

fn parse_param<T: std::str::FromStr<Err = String>>(req: &ApiRequest, key: &str) -> Result<Option<T>, ApiError> {
    req.query_param(key)
        .map(|raw| raw.parse::<T>().map_err(ApiError::BadRequest))
        .transpose()
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}
