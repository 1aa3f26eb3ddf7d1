//! Article domain type
//!
//! The terminal artifact of the pipeline, generated from one ArticlePlan.

use notestore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::generate_id;

/// Character count used as the article's word count
///
/// Counts Unicode scalar values so Japanese text is measured per character.
pub fn count_chars(text: &str) -> usize {
    text.chars().count()
}

/// Article lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    #[default]
    Draft,
    Reviewed,
    Published,
}

impl std::fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Reviewed => write!(f, "reviewed"),
            Self::Published => write!(f, "published"),
        }
    }
}

impl std::str::FromStr for ArticleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "reviewed" => Ok(Self::Reviewed),
            "published" => Ok(Self::Published),
            _ => Err(format!("Unknown article status: {}", s)),
        }
    }
}

/// A generated article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique ID: {hex}-article-{slug}
    pub id: String,

    /// Originating plan; None once the plan is gone
    pub plan_id: Option<String>,

    pub title: String,

    pub content_markdown: String,

    /// Rendered HTML, filled in by external tooling
    pub content_html: Option<String>,

    /// Character count of content_markdown
    pub word_count: usize,

    pub status: ArticleStatus,

    /// Where the article was published
    pub note_url: Option<String>,

    pub published_at: Option<i64>,

    /// Creation timestamp (milliseconds since Unix epoch)
    pub created_at: i64,

    /// Last update timestamp
    pub updated_at: i64,
}

impl Article {
    /// Create a new draft article
    pub fn new(plan_id: Option<String>, title: impl Into<String>, content_markdown: impl Into<String>) -> Self {
        let title = title.into();
        let content_markdown = content_markdown.into();
        debug!(?plan_id, %title, len = content_markdown.len(), "Article::new: called");
        let now = now_ms();
        Self {
            id: generate_id("article", &title),
            plan_id,
            word_count: count_chars(&content_markdown),
            title,
            content_markdown,
            content_html: None,
            status: ArticleStatus::Draft,
            note_url: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the markdown body, recomputing the word count
    pub fn set_content(&mut self, content_markdown: impl Into<String>) {
        self.content_markdown = content_markdown.into();
        self.word_count = count_chars(&self.content_markdown);
        debug!(%self.id, word_count = self.word_count, "Article::set_content: called");
        self.updated_at = now_ms();
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.updated_at = now_ms();
    }

    pub fn set_note_url(&mut self, note_url: Option<String>) {
        self.note_url = note_url;
        self.updated_at = now_ms();
    }

    /// Set status; moving to Published stamps published_at once
    pub fn set_status(&mut self, status: ArticleStatus) {
        debug!(%self.id, from = %self.status, to = %status, "Article::set_status: called");
        let now = now_ms();
        if status == ArticleStatus::Published && self.published_at.is_none() {
            self.published_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }
}

impl Record for Article {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "articles"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        if let Some(plan_id) = &self.plan_id {
            fields.insert("plan_id".to_string(), IndexValue::String(plan_id.clone()));
        }
        fields.insert("created_at".to_string(), IndexValue::Int(self.created_at));
        fields
    }
}
