//! ArticlePlan domain type
//!
//! A structured outline generated from one Topic.

use notestore::{IndexValue, Record, now_ms};
use serde::de::{self, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::generate_id;

/// Plan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Draft,
    /// An article has been generated from it
    Approved,
    Archived,
}

impl std::fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Approved => write!(f, "approved"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "approved" => Ok(Self::Approved),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown plan status: {}", s)),
        }
    }
}

/// One section of the outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSection {
    pub heading: String,

    /// What the section should cover
    pub content: String,

    /// Rough length in characters, when the model gave one
    #[serde(
        rename = "estimatedLength",
        alias = "estimated_length",
        default,
        deserialize_with = "deserialize_length_hint",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_length: Option<u32>,
}

/// A length as models write it: `800`, `800.0`, or `"800"`
#[derive(Deserialize)]
#[serde(untagged)]
enum LengthValue {
    Integer(u64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl LengthValue {
    fn to_length(&self) -> Option<u32> {
        let value = match self {
            Self::Integer(n) => return u32::try_from(*n).ok(),
            Self::Float(f) => *f,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Other(_) => return None,
        };
        (value.is_finite() && (0.0..=u32::MAX as f64).contains(&value)).then(|| value.round() as u32)
    }
}

/// Optional length hint; anything that is not a usable number becomes None
fn deserialize_length_hint<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(LengthValue::deserialize(deserializer)?.to_length())
}

/// Required length, accepting the same spellings as the hint
pub(crate) fn deserialize_length<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = LengthValue::deserialize(deserializer)?;
    value
        .to_length()
        .ok_or_else(|| de::Error::custom("expected a non-negative length"))
}

/// A structured article outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePlan {
    /// Unique ID: {hex}-plan-{slug}
    pub id: String,

    /// Originating topic; None once the topic is gone
    pub topic_id: Option<String>,

    /// Candidate titles, never empty
    pub title_options: Vec<String>,

    pub selected_title: Option<String>,

    pub lead: String,

    pub structure: Vec<PlanSection>,

    /// Target article length in characters
    pub target_length: u32,

    pub notes: Option<String>,

    pub status: PlanStatus,

    /// Creation timestamp (milliseconds since Unix epoch)
    pub created_at: i64,

    /// Last update timestamp
    pub updated_at: i64,
}

impl ArticlePlan {
    /// Create a new draft plan, selecting the first title option
    pub fn new(
        topic_id: Option<String>,
        title_options: Vec<String>,
        lead: impl Into<String>,
        structure: Vec<PlanSection>,
        target_length: u32,
    ) -> Self {
        debug!(?topic_id, num_titles = title_options.len(), num_sections = structure.len(), "ArticlePlan::new: called");
        let now = now_ms();
        let selected_title = title_options.first().cloned();
        Self {
            id: generate_id("plan", selected_title.as_deref().unwrap_or_default()),
            topic_id,
            title_options,
            selected_title,
            lead: lead.into(),
            structure,
            target_length,
            notes: None,
            status: PlanStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title the article should use
    pub fn title(&self) -> &str {
        self.selected_title
            .as_deref()
            .or_else(|| self.title_options.first().map(String::as_str))
            .unwrap_or_default()
    }

    /// Select one of the candidate titles
    pub fn select_title(&mut self, title: &str) -> Result<(), String> {
        debug!(%self.id, %title, "ArticlePlan::select_title: called");
        if !self.title_options.iter().any(|t| t == title) {
            return Err(format!("'{}' is not one of the title options", title));
        }
        self.selected_title = Some(title.to_string());
        self.updated_at = now_ms();
        Ok(())
    }

    /// Set status and bump updated_at
    pub fn set_status(&mut self, status: PlanStatus) {
        debug!(%self.id, from = %self.status, to = %status, "ArticlePlan::set_status: called");
        self.status = status;
        self.updated_at = now_ms();
    }

    pub fn set_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
        self.updated_at = now_ms();
    }
}

impl Record for ArticlePlan {
    fn id(&self) -> &str {
        &self.id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn collection_name() -> &'static str {
        "article_plans"
    }

    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        let mut fields = HashMap::new();
        fields.insert("status".to_string(), IndexValue::String(self.status.to_string()));
        if let Some(topic_id) = &self.topic_id {
            fields.insert("topic_id".to_string(), IndexValue::String(topic_id.clone()));
        }
        fields.insert("created_at".to_string(), IndexValue::Int(self.created_at));
        fields
    }
}
