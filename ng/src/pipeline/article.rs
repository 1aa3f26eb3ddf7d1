//! Article stage

use serde::Deserialize;
use tracing::{debug, info};

use super::{Attempt, Pipeline, PipelineError, StageOutput};
use crate::decode::ResponseSchema;
use crate::domain::{Article, Stage};

/// Heading of the synthesized closing section
const SUMMARY_HEADING: &str = "まとめ";

/// One body section of the drafted article
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArticleResponseSection {
    pub heading: String,
    pub content: String,
}

/// Decoded article-stage reply
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleResponse {
    pub title: String,
    pub sections: Vec<ArticleResponseSection>,
    pub summary: String,
    pub cta: String,
}

impl ResponseSchema for ArticleResponse {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".to_string());
        }
        if self.sections.is_empty() {
            return Err("sections is empty".to_string());
        }
        if let Some(idx) = self.sections.iter().position(|s| s.heading.trim().is_empty()) {
            return Err(format!("section {} has an empty heading", idx + 1));
        }
        if self.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        Ok(())
    }
}

impl ArticleResponse {
    pub fn to_markdown(&self) -> String {
        assemble_markdown(&self.title, &self.sections, &self.summary, &self.cta)
    }
}

/// Render the article body
///
/// `# title`, then each section as `## heading` plus its content, then the
/// summary section and the call to action, separated by blank lines.
pub fn assemble_markdown(title: &str, sections: &[ArticleResponseSection], summary: &str, cta: &str) -> String {
    let body = sections
        .iter()
        .map(|s| format!("## {}\n\n{}", s.heading, s.content))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("# {title}\n\n{body}\n\n## {SUMMARY_HEADING}\n\n{summary}\n\n{cta}")
}

impl Pipeline {
    /// Draft the full article for one plan
    ///
    /// Inserts a draft article and marks the plan approved, in one commit.
    /// The plan's topic is used for extra context when it still exists.
    pub async fn generate_article(&self, plan_id: &str) -> Result<StageOutput<Article>, PipelineError> {
        info!(%plan_id, "generate_article: starting");
        let mut attempt = Attempt::new(Stage::Article);
        let result = self.run_article(&mut attempt, plan_id).await;
        let reference_id = result.as_ref().ok().map(|o| o.record.id.clone());
        self.record_attempt(attempt, &result, reference_id).await;
        result
    }

    async fn run_article(&self, attempt: &mut Attempt, plan_id: &str) -> Result<StageOutput<Article>, PipelineError> {
        let (plan, topic) = self
            .state
            .get_plan_with_topic(plan_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(format!("Plan not found: {}", plan_id)))?;
        debug!(plan_id = %plan.id, has_topic = topic.is_some(), "run_article: loaded plan");

        let prompt = self
            .prompts
            .article_prompt(&plan, topic.as_ref())
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let response: ArticleResponse = self.invoke(attempt, prompt, self.config.article_max_tokens).await?;

        let markdown = response.to_markdown();
        let article = Article::new(Some(plan.id), response.title, markdown);
        debug!(article_id = %article.id, word_count = article.word_count, "run_article: assembled");
        self.state.commit_article(article.clone()).await?;

        Ok(attempt.output(article))
    }
}
