//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to
//! embedded defaults, then renders them for each stage.

use std::path::Path;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;
use crate::domain::{ArticlePlan, Topic, TopicCategory};

/// Context for the topic template
#[derive(Debug, Serialize)]
struct TopicContext {
    count: u32,
    /// True when the caller narrowed the category set
    restricted: bool,
    categories: Vec<&'static str>,
}

/// Context for the plan template
#[derive(Debug, Serialize)]
struct PlanContext<'a> {
    name: &'a str,
    category: &'static str,
    priority: i64,
    keywords: String,
    target_audience: &'a str,
    angle: &'a str,
}

/// Topic details embedded in the article template
#[derive(Debug, Serialize)]
struct ArticleTopicContext<'a> {
    name: &'a str,
    category: &'static str,
    keywords: String,
}

#[derive(Debug, Serialize)]
struct ArticleSectionContext<'a> {
    /// 1-based position
    number: usize,
    heading: &'a str,
    content: &'a str,
    estimated_length: String,
}

/// Context for the article template
#[derive(Debug, Serialize)]
struct ArticleContext<'a> {
    topic: Option<ArticleTopicContext<'a>>,
    title: &'a str,
    lead: &'a str,
    sections: Vec<ArticleSectionContext<'a>>,
    target_length: u32,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars registry with every stage template registered
    hbs: Handlebars<'static>,
}

impl PromptLoader {
    /// Create a loader, preferring `{user_dir}/{name}.pmt` over the embedded defaults
    pub fn new(user_dir: Option<&Path>) -> Result<Self> {
        debug!(?user_dir, "PromptLoader::new: called");
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);

        for name in embedded::TEMPLATE_NAMES {
            let template = Self::load_template(user_dir, name)?;
            hbs.register_template_string(name, template)
                .map_err(|e| eyre!("Failed to parse prompt template {}: {}", name, e))?;
        }

        Ok(Self { hbs })
    }

    /// Create a loader that only uses embedded prompts
    pub fn embedded_only() -> Result<Self> {
        debug!("PromptLoader::embedded_only: called");
        Self::new(None)
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `{user_dir}/{name}.pmt`
    /// 2. Embedded fallback
    fn load_template(user_dir: Option<&Path>, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(user_dir) = user_dir {
            let path = user_dir.join(format!("{}.pmt", name));
            if path.exists() {
                info!(path = %path.display(), "Using prompt override");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read user prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found in user override");
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let rendered = self
            .hbs
            .render(template_name, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))?;
        Ok(rendered.trim().to_string())
    }

    /// Prompt asking for `count` topic candidates
    ///
    /// An empty category slice means "draw from every category".
    pub fn topic_prompt(&self, count: u32, categories: &[TopicCategory]) -> Result<String> {
        debug!(%count, num_categories = categories.len(), "PromptLoader::topic_prompt: called");
        let mut selected: Vec<TopicCategory> = Vec::new();
        for category in categories {
            if !selected.contains(category) {
                selected.push(*category);
            }
        }
        let restricted = !selected.is_empty();
        let pool = if restricted { selected } else { TopicCategory::ALL.to_vec() };

        self.render(
            "topic",
            &TopicContext {
                count,
                restricted,
                categories: pool.iter().map(|c| c.label()).collect(),
            },
        )
    }

    /// Prompt asking for an outline of one topic
    pub fn plan_prompt(&self, topic: &Topic) -> Result<String> {
        debug!(topic_id = %topic.id, "PromptLoader::plan_prompt: called");
        self.render(
            "plan",
            &PlanContext {
                name: &topic.name,
                category: topic.category.label(),
                priority: topic.priority,
                keywords: topic.keywords.join(", "),
                target_audience: &topic.target_audience,
                angle: &topic.angle,
            },
        )
    }

    /// Prompt asking for the full article described by a plan
    pub fn article_prompt(&self, plan: &ArticlePlan, topic: Option<&Topic>) -> Result<String> {
        debug!(plan_id = %plan.id, has_topic = topic.is_some(), "PromptLoader::article_prompt: called");
        let sections = plan
            .structure
            .iter()
            .enumerate()
            .map(|(idx, section)| ArticleSectionContext {
                number: idx + 1,
                heading: &section.heading,
                content: &section.content,
                estimated_length: section
                    .estimated_length
                    .map(|n| format!("{}字", n))
                    .unwrap_or_else(|| "未定".to_string()),
            })
            .collect();

        self.render(
            "article",
            &ArticleContext {
                topic: topic.map(|t| ArticleTopicContext {
                    name: &t.name,
                    category: t.category.label(),
                    keywords: t.keywords.join(", "),
                }),
                title: plan.title(),
                lead: &plan.lead,
                sections,
                target_length: plan.target_length,
            },
        )
    }
}
