//! Topic domain type
//!
//! A candidate subject for an article. Created in bulk by the topic stage,
//! consumed once by the plan stage.

use notestore::{IndexValue, Record, now_ms};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::{TopicCategory, generate_id};

/// Topic lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    /// Ready to be planned
    #[default]
    Available,
    /// Picked by an editor but not yet planned
    Selected,
    /// A plan has been generated from it
    Used,
}

impl std::fmt::Display for TopicStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Selected => write!(f, "selected"),
            Self::Used => write!(f, "used"),
        }
    }
}

impl std::str::FromStr for TopicStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "selected" => Ok(Self::Selected),
            "used" => Ok(Self::Used),
            _ => Err(format!("Unknown topic status: {}", s)),
        }
    }
}

/// A candidate article subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Unique ID: {hex}-topic-{slug}
    pub id: String,

    pub name: String,

    pub category: TopicCategory,

    /// Higher is more favorable (1-10 when generated)
    pub priority: i64,

    pub keywords: Vec<String>,

    pub target_audience: String,

    /// Narrative angle the article should take
    pub angle: String,

    pub status: TopicStatus,

    /// Creation timestamp (milliseconds since Unix epoch)
    pub created_at: i64,

    /// Last update timestamp
    pub updated_at: i64,
}

impl Topic {
    /// Create a new available Topic
    pub fn new(name: impl Into<String>, category: TopicCategory) -> Self {
        let name = name.into();
        debug!(%name, %category, "Topic::new: called");
        let now = now_ms();
        Self {
            id: generate_id("topic", &name),
            name,
            category,
            priority: 5,
            keywords: Vec::new(),
            target_audience: String::new(),
            angle: String::new(),
            status: TopicStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder: set priority
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set keywords
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Builder: set target audience
    pub fn with_target_audience(mut self, target_audience: impl Into<String>) -> Self {
        self.target_audience = target_audience.into();
        self
    }

    /// Builder: set angle
    pub fn with_angle(mut self, angle: impl Into<String>) -> Self {
        self.angle = angle.into();
        self
    }

    /// Set status and bump updated_at
    pub fn set_status(&mut self, status: TopicStatus) {
        debug!(%self.id, from = %self.status, to = %status, "Topic::set_status: called");
        self.status = status;
        self.updated_at = now_ms();
    }
}

impl Record for Topic {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "topics"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        fields.insert("category".to_string(), IndexValue::String(self.category.label().to_string()));
        fields.insert("priority".to_string(), IndexValue::Int(self.priority));
        fields.insert("created_at".to_string(), IndexValue::Int(self.created_at));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_new() {
        let topic = Topic::new("議事録の自動作成", TopicCategory::BusinessEfficiency);
        assert!(topic.id.contains("-topic-"));
        assert_eq!(topic.status, TopicStatus::Available);
        assert_eq!(topic.priority, 5);
        assert_eq!(topic.created_at, topic.updated_at);
    }

    #[test]
    fn test_topic_builder() {
        let topic = Topic::new("RAG入門", TopicCategory::Engineering)
            .with_priority(9)
            .with_keywords(vec!["RAG".to_string(), "検索".to_string()])
            .with_target_audience("情シス担当者")
            .with_angle("小さく始める");

        assert_eq!(topic.priority, 9);
        assert_eq!(topic.keywords.len(), 2);
        assert_eq!(topic.target_audience, "情シス担当者");
        assert_eq!(topic.angle, "小さく始める");
    }

    #[test]
    fn test_topic_status_roundtrip() {
        for status in [TopicStatus::Available, TopicStatus::Selected, TopicStatus::Used] {
            assert_eq!(status.to_string().parse::<TopicStatus>().unwrap(), status);
        }
        assert!("archived".parse::<TopicStatus>().is_err());
    }

    #[test]
    fn test_topic_indexed_fields() {
        let mut topic = Topic::new("x", TopicCategory::Creative).with_priority(7);
        topic.set_status(TopicStatus::Used);
        let fields = topic.indexed_fields();

        assert_eq!(fields.get("status"), Some(&IndexValue::String("used".to_string())));
        assert_eq!(
            fields.get("category"),
            Some(&IndexValue::String("クリエイティブ制作".to_string()))
        );
        assert_eq!(fields.get("priority"), Some(&IndexValue::Int(7)));
    }

    #[test]
    fn test_topic_serde_field_names() {
        let topic = Topic::new("x", TopicCategory::Creative).with_target_audience("誰か");
        let json = serde_json::to_value(&topic).unwrap();
        assert_eq!(json["target_audience"], "誰か");
        assert_eq!(json["status"], "available");
    }
}
