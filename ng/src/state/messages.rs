//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::PipelineStats;
use crate::domain::{
    Article, ArticlePlan, ArticleStatus, GenerationLog, PlanStatus, Stage, Topic, TopicCategory, TopicStatus,
};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Topic operations
    CreateTopics {
        topics: Vec<Topic>,
        reply: oneshot::Sender<StateResponse<Vec<String>>>,
    },
    GetTopic {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Topic>>>,
    },
    UpdateTopic {
        topic: Topic,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListTopics {
        status_filter: Option<TopicStatus>,
        category_filter: Option<TopicCategory>,
        reply: oneshot::Sender<StateResponse<Vec<Topic>>>,
    },

    // ArticlePlan operations
    /// Insert a plan and mark its topic used, atomically
    CommitPlan {
        plan: ArticlePlan,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetPlan {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<ArticlePlan>>>,
    },
    UpdatePlan {
        plan: ArticlePlan,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListPlans {
        status_filter: Option<PlanStatus>,
        reply: oneshot::Sender<StateResponse<Vec<ArticlePlan>>>,
    },

    // Article operations
    /// Insert an article and mark its plan approved, atomically
    CommitArticle {
        article: Article,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    GetArticle {
        id: String,
        reply: oneshot::Sender<StateResponse<Option<Article>>>,
    },
    UpdateArticle {
        article: Article,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    ListArticles {
        status_filter: Option<ArticleStatus>,
        reply: oneshot::Sender<StateResponse<Vec<Article>>>,
    },

    // GenerationLog operations
    AppendLog {
        log: GenerationLog,
        reply: oneshot::Sender<StateResponse<String>>,
    },
    ListLogs {
        stage_filter: Option<Stage>,
        limit: usize,
        reply: oneshot::Sender<StateResponse<Vec<GenerationLog>>>,
    },

    // Aggregates
    GetStats {
        reply: oneshot::Sender<StateResponse<PipelineStats>>,
    },

    // Shutdown
    Shutdown,
}
