//! Notegen - LLM-driven content pipeline
//!
//! Notegen turns subjects into publishable articles in three stages, each a
//! single completion round trip:
//!
//! ```text
//! topic:   count + categories -> Topic[]        (status: available)
//! plan:    Topic              -> ArticlePlan    (topic -> used)
//! article: ArticlePlan        -> Article        (plan -> approved)
//! ```
//!
//! Every stage invocation writes exactly one GenerationLog row.
//!
//! # Modules
//!
//! - [`api`] - Method + path invocation surface
//! - [`pipeline`] - Stage orchestrators
//! - [`llm`] - Completion client trait and Anthropic implementation
//! - [`decode`] - JSON extraction from completion text
//! - [`prompts`] - Handlebars prompt templates
//! - [`state`] - Actor owning the record store
//! - [`domain`] - Topic, ArticlePlan, Article, GenerationLog
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod decode;
pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod state;
