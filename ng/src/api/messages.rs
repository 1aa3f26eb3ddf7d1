//! Invocation surface message types
//!
//! A request is a method, a path, optional query parameters, and an optional
//! JSON body. A response is a status code plus a JSON body; failures carry
//! `{"error": message}`.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PATCH" => Ok(Self::Patch),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            _ => Err(format!("Unknown method: {}", s)),
        }
    }
}

/// A call into the invocation surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Build a request from a target such as `/api/topics?status=used`
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, BTreeMap::new()),
        };
        Self {
            method,
            path: path.to_string(),
            query,
            body: None,
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: &str, body: Value) -> Self {
        Self::new(Method::Post, target).with_body(body)
    }

    pub fn patch(target: &str, body: Value) -> Self {
        Self::new(Method::Patch, target).with_body(body)
    }

    /// Builder: set the JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Builder: add a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Non-empty query parameter
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Result of a call into the invocation surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn created(body: Value) -> Self {
        Self { status: 201, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Message of an error body, if this is one
    pub fn error_message(&self) -> Option<&str> {
        self.body.get("error").and_then(Value::as_str)
    }
}

// === Request bodies ===

/// Body of POST /api/topics/generate
#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateTopicsBody {
    pub count: Option<u32>,
    pub categories: Option<Vec<String>>,
}

/// Body of POST /api/plans/generate
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeneratePlanBody {
    #[serde(alias = "topic_id")]
    pub topic_id: Option<String>,
}

/// Body of POST /api/articles/generate
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateArticleBody {
    #[serde(alias = "plan_id")]
    pub plan_id: Option<String>,
}

/// Body of POST /api/topics
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateTopicBody {
    #[serde(alias = "topic_name")]
    pub name: Option<String>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub keywords: Option<Vec<String>>,
    #[serde(alias = "target_audience")]
    pub target_audience: Option<String>,
    pub angle: Option<String>,
}

/// Body of PATCH /api/topics/{id}
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UpdateTopicBody {
    pub status: Option<String>,
}

/// Body of PATCH /api/plans/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePlanBody {
    #[serde(alias = "selected_title")]
    pub selected_title: Option<String>,
    pub notes: Option<String>,
    pub status: Option<String>,
}

/// Body of PATCH /api/articles/{id}
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateArticleBody {
    pub title: Option<String>,
    #[serde(alias = "content_markdown")]
    pub content_markdown: Option<String>,
    #[serde(alias = "note_url")]
    pub note_url: Option<String>,
    pub status: Option<String>,
}
