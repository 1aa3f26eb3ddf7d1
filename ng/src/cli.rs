//! CLI command definitions and subcommands
//!
//! Every subcommand maps onto one invocation-surface request.

use clap::{Parser, Subcommand};
use eyre::{Context, Result};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use tracing::debug;

use crate::api::{ApiRequest, Method};

/// Notegen - topic, plan, and article generation pipeline
#[derive(Debug, Parser)]
#[command(
    name = "notegen",
    about = "Content pipeline that turns topics into plans into articles",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// SQLite database file, overriding storage.database
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate and curate topics
    Topics {
        #[command(subcommand)]
        command: TopicsCommand,
    },

    /// Generate and curate article plans
    Plans {
        #[command(subcommand)]
        command: PlansCommand,
    },

    /// Generate and edit articles
    Articles {
        #[command(subcommand)]
        command: ArticlesCommand,
    },

    /// Show generation logs, newest first
    Logs {
        /// Only this stage (topic, plan, article)
        #[arg(short, long)]
        stage: Option<String>,

        /// Number of entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Show pipeline counts
    Stats,

    /// Send a raw request to the invocation surface
    Request {
        /// GET, POST, PATCH, ...
        method: String,

        /// Path with optional query, e.g. /api/topics?status=available
        path: String,

        /// JSON body
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TopicsCommand {
    /// Ask the model for new topics
    Generate {
        /// How many topics to request
        #[arg(short = 'n', long)]
        count: Option<u32>,

        /// Restrict to a category (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// List topics, highest priority first
    List {
        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Add a topic by hand
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        category: String,

        #[arg(short, long)]
        priority: Option<i64>,

        /// Comma-separated keywords
        #[arg(short, long, value_delimiter = ',')]
        keywords: Vec<String>,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        angle: Option<String>,
    },

    /// Mark a topic selected
    Select { id: String },
}

#[derive(Debug, Subcommand)]
pub enum PlansCommand {
    /// Generate a plan from a topic
    Generate {
        #[arg(value_name = "TOPIC_ID")]
        topic_id: String,
    },

    /// List plans, newest first
    List {
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show a plan with its topic
    Show { id: String },

    /// Choose one of the plan's title options
    SelectTitle { id: String, title: String },

    /// Archive a plan
    Archive { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ArticlesCommand {
    /// Generate an article from a plan
    Generate {
        #[arg(value_name = "PLAN_ID")]
        plan_id: String,
    },

    /// List articles, newest first
    List {
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Show an article
    Show { id: String },

    /// Replace an article's title, body, or publish URL
    Edit {
        id: String,

        #[arg(short, long)]
        title: Option<String>,

        /// Markdown file with the new body
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        url: Option<String>,
    },

    /// Mark an article reviewed
    Review { id: String },

    /// Mark an article published
    Publish {
        id: String,

        #[arg(short, long)]
        url: Option<String>,
    },
}

fn with_optional_query(req: ApiRequest, key: &str, value: &Option<String>) -> ApiRequest {
    match value {
        Some(v) => req.with_query(key, v.clone()),
        None => req,
    }
}

impl Command {
    /// Build the request this subcommand stands for
    pub fn to_request(&self) -> Result<ApiRequest> {
        debug!(command = ?self, "to_request: called");
        let req = match self {
            Command::Topics { command } => match command {
                TopicsCommand::Generate { count, categories } => {
                    let mut body = Map::new();
                    if let Some(count) = count {
                        body.insert("count".to_string(), json!(count));
                    }
                    if !categories.is_empty() {
                        body.insert("categories".to_string(), json!(categories));
                    }
                    ApiRequest::post("/api/topics/generate", Value::Object(body))
                }
                TopicsCommand::List { status, category } => {
                    let req = with_optional_query(ApiRequest::get("/api/topics"), "status", status);
                    with_optional_query(req, "category", category)
                }
                TopicsCommand::Add {
                    name,
                    category,
                    priority,
                    keywords,
                    audience,
                    angle,
                } => ApiRequest::post(
                    "/api/topics",
                    json!({
                        "name": name,
                        "category": category,
                        "priority": priority,
                        "keywords": keywords,
                        "targetAudience": audience,
                        "angle": angle,
                    }),
                ),
                TopicsCommand::Select { id } => {
                    ApiRequest::patch(&format!("/api/topics/{}", id), json!({ "status": "selected" }))
                }
            },

            Command::Plans { command } => match command {
                PlansCommand::Generate { topic_id } => {
                    ApiRequest::post("/api/plans/generate", json!({ "topicId": topic_id }))
                }
                PlansCommand::List { status } => with_optional_query(ApiRequest::get("/api/plans"), "status", status),
                PlansCommand::Show { id } => ApiRequest::get(&format!("/api/plans/{}", id)),
                PlansCommand::SelectTitle { id, title } => {
                    ApiRequest::patch(&format!("/api/plans/{}", id), json!({ "selectedTitle": title }))
                }
                PlansCommand::Archive { id } => {
                    ApiRequest::patch(&format!("/api/plans/{}", id), json!({ "status": "archived" }))
                }
            },

            Command::Articles { command } => match command {
                ArticlesCommand::Generate { plan_id } => {
                    ApiRequest::post("/api/articles/generate", json!({ "planId": plan_id }))
                }
                ArticlesCommand::List { status } => {
                    with_optional_query(ApiRequest::get("/api/articles"), "status", status)
                }
                ArticlesCommand::Show { id } => ApiRequest::get(&format!("/api/articles/{}", id)),
                ArticlesCommand::Edit { id, title, file, url } => {
                    let mut body = Map::new();
                    if let Some(title) = title {
                        body.insert("title".to_string(), json!(title));
                    }
                    if let Some(file) = file {
                        let content = std::fs::read_to_string(file)
                            .context(format!("Failed to read article body from {}", file.display()))?;
                        body.insert("contentMarkdown".to_string(), json!(content));
                    }
                    if let Some(url) = url {
                        body.insert("noteUrl".to_string(), json!(url));
                    }
                    if body.is_empty() {
                        return Err(eyre::eyre!("Nothing to edit: pass --title, --file, or --url"));
                    }
                    ApiRequest::patch(&format!("/api/articles/{}", id), Value::Object(body))
                }
                ArticlesCommand::Review { id } => {
                    ApiRequest::patch(&format!("/api/articles/{}", id), json!({ "status": "reviewed" }))
                }
                ArticlesCommand::Publish { id, url } => {
                    let mut body = json!({ "status": "published" });
                    if let Some(url) = url {
                        body["noteUrl"] = json!(url);
                    }
                    ApiRequest::patch(&format!("/api/articles/{}", id), body)
                }
            },

            Command::Logs { stage, limit } => {
                let req = with_optional_query(ApiRequest::get("/api/logs"), "stage", stage);
                match limit {
                    Some(limit) => req.with_query("limit", limit.to_string()),
                    None => req,
                }
            }

            Command::Stats => ApiRequest::get("/api/stats"),

            Command::Request { method, path, body } => {
                let method: Method = method.parse().map_err(|e: String| eyre::eyre!(e))?;
                let req = ApiRequest::new(method, path);
                match body {
                    Some(raw) => req.with_body(serde_json::from_str(raw).context("--body is not valid JSON")?),
                    None => req,
                }
            }
        };
        Ok(req)
    }
}
