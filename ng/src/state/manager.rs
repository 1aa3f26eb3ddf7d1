//! StateManager - actor that owns the NoteStore
//!
//! Processes commands via channels so every store access, including the
//! two-write commits of the plan and article stages, is serialized.

use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::domain::{
    Article, ArticlePlan, ArticleStatus, Filter, GenerationLog, Order, PlanStatus, Record, Stage, Store, Topic,
    TopicCategory, TopicStatus,
};

use super::messages::{StateCommand, StateError, StateResponse};

/// Dashboard counts across the pipeline
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStats {
    pub topics_total: u64,
    pub topics_available: u64,
    pub topics_used: u64,
    pub plans_total: u64,
    pub plans_draft: u64,
    pub plans_approved: u64,
    pub articles_total: u64,
    pub articles_draft: u64,
    pub articles_reviewed: u64,
    pub articles_published: u64,
    pub generations_succeeded: u64,
    pub generations_failed: u64,
    /// Tokens consumed across every logged invocation
    pub tokens_total: u64,
}

/// Handle to send commands to the StateManager
#[derive(Clone)]
pub struct StateManager {
    tx: mpsc::Sender<StateCommand>,
}

impl StateManager {
    /// Spawn a new StateManager actor over the database at `store_path`
    pub fn spawn(store_path: impl AsRef<Path>) -> eyre::Result<Self> {
        debug!(store_path = %store_path.as_ref().display(), "spawn: called");
        let store = Store::open(store_path.as_ref())?;
        Ok(Self::spawn_with_store(store))
    }

    /// Spawn a StateManager over a throwaway in-memory database
    pub fn spawn_in_memory() -> eyre::Result<Self> {
        debug!("spawn_in_memory: called");
        let store = Store::open_in_memory()?;
        Ok(Self::spawn_with_store(store))
    }

    fn spawn_with_store(store: Store) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(store, rx));
        info!("StateManager spawned");
        Self { tx }
    }

    /// Send a command and wait for its reply
    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<StateResponse<T>>) -> StateCommand) -> StateResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| StateError::ChannelError)?;
        reply_rx.await.map_err(|_| StateError::ChannelError)?
    }

    // === Topic operations ===

    /// Insert a batch of topics in one transaction
    pub async fn create_topics(&self, topics: Vec<Topic>) -> StateResponse<Vec<String>> {
        debug!(count = topics.len(), "create_topics: called");
        self.request(|reply| StateCommand::CreateTopics { topics, reply }).await
    }

    pub async fn get_topic(&self, id: &str) -> StateResponse<Option<Topic>> {
        debug!(%id, "get_topic: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetTopic { id, reply }).await
    }

    pub async fn update_topic(&self, topic: Topic) -> StateResponse<()> {
        debug!(topic_id = %topic.id, status = %topic.status, "update_topic: called");
        self.request(|reply| StateCommand::UpdateTopic { topic, reply }).await
    }

    /// List topics, highest priority first, newest first within a priority
    pub async fn list_topics(
        &self,
        status_filter: Option<TopicStatus>,
        category_filter: Option<TopicCategory>,
    ) -> StateResponse<Vec<Topic>> {
        debug!(?status_filter, ?category_filter, "list_topics: called");
        self.request(|reply| StateCommand::ListTopics {
            status_filter,
            category_filter,
            reply,
        })
        .await
    }

    // === ArticlePlan operations ===

    /// Insert a plan and mark its source topic used
    ///
    /// Both writes commit together. A source topic that no longer exists is
    /// skipped with a warning.
    pub async fn commit_plan(&self, plan: ArticlePlan) -> StateResponse<String> {
        debug!(plan_id = %plan.id, topic_id = ?plan.topic_id, "commit_plan: called");
        self.request(|reply| StateCommand::CommitPlan { plan, reply }).await
    }

    pub async fn get_plan(&self, id: &str) -> StateResponse<Option<ArticlePlan>> {
        debug!(%id, "get_plan: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetPlan { id, reply }).await
    }

    pub async fn update_plan(&self, plan: ArticlePlan) -> StateResponse<()> {
        debug!(plan_id = %plan.id, status = %plan.status, "update_plan: called");
        self.request(|reply| StateCommand::UpdatePlan { plan, reply }).await
    }

    /// List plans, newest first
    pub async fn list_plans(&self, status_filter: Option<PlanStatus>) -> StateResponse<Vec<ArticlePlan>> {
        debug!(?status_filter, "list_plans: called");
        self.request(|reply| StateCommand::ListPlans { status_filter, reply })
            .await
    }

    /// Load a plan together with its source topic, if both still exist
    pub async fn get_plan_with_topic(&self, id: &str) -> StateResponse<Option<(ArticlePlan, Option<Topic>)>> {
        debug!(%id, "get_plan_with_topic: called");
        let Some(plan) = self.get_plan(id).await? else {
            return Ok(None);
        };
        let topic = match &plan.topic_id {
            Some(topic_id) => self.get_topic(topic_id).await?,
            None => None,
        };
        Ok(Some((plan, topic)))
    }

    // === Article operations ===

    /// Insert an article and mark its source plan approved
    ///
    /// Both writes commit together. A source plan that no longer exists is
    /// skipped with a warning.
    pub async fn commit_article(&self, article: Article) -> StateResponse<String> {
        debug!(article_id = %article.id, plan_id = ?article.plan_id, "commit_article: called");
        self.request(|reply| StateCommand::CommitArticle { article, reply })
            .await
    }

    pub async fn get_article(&self, id: &str) -> StateResponse<Option<Article>> {
        debug!(%id, "get_article: called");
        let id = id.to_string();
        self.request(|reply| StateCommand::GetArticle { id, reply }).await
    }

    pub async fn update_article(&self, article: Article) -> StateResponse<()> {
        debug!(article_id = %article.id, status = %article.status, "update_article: called");
        self.request(|reply| StateCommand::UpdateArticle { article, reply })
            .await
    }

    /// List articles, newest first
    pub async fn list_articles(&self, status_filter: Option<ArticleStatus>) -> StateResponse<Vec<Article>> {
        debug!(?status_filter, "list_articles: called");
        self.request(|reply| StateCommand::ListArticles { status_filter, reply })
            .await
    }

    // === GenerationLog operations ===

    pub async fn append_log(&self, log: GenerationLog) -> StateResponse<String> {
        debug!(log_id = %log.id, stage = %log.stage, success = log.success, "append_log: called");
        self.request(|reply| StateCommand::AppendLog { log, reply }).await
    }

    /// Most recent logs first, at most `limit`
    pub async fn list_logs(&self, stage_filter: Option<Stage>, limit: usize) -> StateResponse<Vec<GenerationLog>> {
        debug!(?stage_filter, limit, "list_logs: called");
        self.request(|reply| StateCommand::ListLogs {
            stage_filter,
            limit,
            reply,
        })
        .await
    }

    // === Aggregates ===

    pub async fn stats(&self) -> StateResponse<PipelineStats> {
        debug!("stats: called");
        self.request(|reply| StateCommand::GetStats { reply }).await
    }

    /// Shutdown the StateManager
    pub async fn shutdown(&self) -> Result<(), StateError> {
        debug!("shutdown: called");
        self.tx
            .send(StateCommand::Shutdown)
            .await
            .map_err(|_| StateError::ChannelError)
    }
}

fn store_err(e: eyre::Report) -> StateError {
    StateError::StoreError(e.to_string())
}

fn status_filters(value: Option<impl ToString>) -> Vec<Filter> {
    value.map(|v| vec![Filter::eq("status", v.to_string())]).unwrap_or_default()
}

fn commit_plan(store: &mut Store, plan: ArticlePlan) -> eyre::Result<String> {
    store.transaction(|tx| {
        let topic_id = plan.topic_id.clone();
        let id = tx.create(plan)?;
        if let Some(topic_id) = topic_id {
            match tx.get::<Topic>(&topic_id)? {
                Some(mut topic) => {
                    topic.set_status(TopicStatus::Used);
                    tx.update(topic)?;
                }
                None => warn!(%topic_id, plan_id = %id, "commit_plan: source topic is gone, not marking used"),
            }
        }
        Ok(id)
    })
}

fn commit_article(store: &mut Store, article: Article) -> eyre::Result<String> {
    store.transaction(|tx| {
        let plan_id = article.plan_id.clone();
        let id = tx.create(article)?;
        if let Some(plan_id) = plan_id {
            match tx.get::<ArticlePlan>(&plan_id)? {
                Some(mut plan) => {
                    plan.set_status(PlanStatus::Approved);
                    tx.update(plan)?;
                }
                None => warn!(%plan_id, article_id = %id, "commit_article: source plan is gone, not approving"),
            }
        }
        Ok(id)
    })
}

fn count_status<T: Record>(store: &Store, status: impl ToString) -> eyre::Result<u64> {
    Ok(store.count::<T>(&[Filter::eq("status", status.to_string())])? as u64)
}

fn compute_stats(store: &Store) -> eyre::Result<PipelineStats> {
    let count_logs = |success: bool| -> eyre::Result<u64> {
        Ok(store.count::<GenerationLog>(&[Filter::eq("success", success)])? as u64)
    };
    Ok(PipelineStats {
        topics_total: store.count::<Topic>(&[])? as u64,
        topics_available: count_status::<Topic>(store, TopicStatus::Available)?,
        topics_used: count_status::<Topic>(store, TopicStatus::Used)?,
        plans_total: store.count::<ArticlePlan>(&[])? as u64,
        plans_draft: count_status::<ArticlePlan>(store, PlanStatus::Draft)?,
        plans_approved: count_status::<ArticlePlan>(store, PlanStatus::Approved)?,
        articles_total: store.count::<Article>(&[])? as u64,
        articles_draft: count_status::<Article>(store, ArticleStatus::Draft)?,
        articles_reviewed: count_status::<Article>(store, ArticleStatus::Reviewed)?,
        articles_published: count_status::<Article>(store, ArticleStatus::Published)?,
        generations_succeeded: count_logs(true)?,
        generations_failed: count_logs(false)?,
        tokens_total: store.sum::<GenerationLog>("tokens_used", &[])?.max(0) as u64,
    })
}

/// The actor loop that owns the Store and processes commands
async fn actor_loop(mut store: Store, mut rx: mpsc::Receiver<StateCommand>) {
    debug!("StateManager actor started");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            // Topic operations
            StateCommand::CreateTopics { topics, reply } => {
                debug!(count = topics.len(), "actor_loop: CreateTopics command");
                let result = store.create_many(topics).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetTopic { id, reply } => {
                debug!(%id, "actor_loop: GetTopic command");
                let result: StateResponse<Option<Topic>> = store.get(&id).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdateTopic { topic, reply } => {
                debug!(topic_id = %topic.id, "actor_loop: UpdateTopic command");
                let result = store.update(topic).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListTopics {
                status_filter,
                category_filter,
                reply,
            } => {
                debug!(?status_filter, ?category_filter, "actor_loop: ListTopics command");
                let mut filters = status_filters(status_filter);
                if let Some(category) = category_filter {
                    filters.push(Filter::eq("category", category.label()));
                }
                let result: StateResponse<Vec<Topic>> = store
                    .list_ordered(&filters, &[Order::desc("priority"), Order::desc("created_at")])
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            // ArticlePlan operations
            StateCommand::CommitPlan { plan, reply } => {
                debug!(plan_id = %plan.id, "actor_loop: CommitPlan command");
                let result = commit_plan(&mut store, plan).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetPlan { id, reply } => {
                debug!(%id, "actor_loop: GetPlan command");
                let result: StateResponse<Option<ArticlePlan>> = store.get(&id).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdatePlan { plan, reply } => {
                debug!(plan_id = %plan.id, "actor_loop: UpdatePlan command");
                let result = store.update(plan).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListPlans { status_filter, reply } => {
                debug!(?status_filter, "actor_loop: ListPlans command");
                let result: StateResponse<Vec<ArticlePlan>> = store
                    .list_ordered(&status_filters(status_filter), &[Order::desc("created_at")])
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            // Article operations
            StateCommand::CommitArticle { article, reply } => {
                debug!(article_id = %article.id, "actor_loop: CommitArticle command");
                let result = commit_article(&mut store, article).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetArticle { id, reply } => {
                debug!(%id, "actor_loop: GetArticle command");
                let result: StateResponse<Option<Article>> = store.get(&id).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::UpdateArticle { article, reply } => {
                debug!(article_id = %article.id, "actor_loop: UpdateArticle command");
                let result = store.update(article).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListArticles { status_filter, reply } => {
                debug!(?status_filter, "actor_loop: ListArticles command");
                let result: StateResponse<Vec<Article>> = store
                    .list_ordered(&status_filters(status_filter), &[Order::desc("created_at")])
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            // GenerationLog operations
            StateCommand::AppendLog { log, reply } => {
                debug!(log_id = %log.id, "actor_loop: AppendLog command");
                let result = store.create(log).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::ListLogs {
                stage_filter,
                limit,
                reply,
            } => {
                debug!(?stage_filter, limit, "actor_loop: ListLogs command");
                let filters = stage_filter
                    .map(|s| vec![Filter::eq("stage", s.to_string())])
                    .unwrap_or_default();
                let result: StateResponse<Vec<GenerationLog>> = store
                    .list_limited(&filters, &[Order::desc("created_at")], limit)
                    .map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::GetStats { reply } => {
                debug!("actor_loop: GetStats command");
                let result = compute_stats(&store).map_err(store_err);
                let _ = reply.send(result);
            }

            StateCommand::Shutdown => {
                info!("StateManager shutting down");
                break;
            }
        }
    }

    debug!("StateManager actor stopped");
}
