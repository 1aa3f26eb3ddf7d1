//! End-to-end pipeline behaviour over an on-disk store

mod common;

use common::{ARTICLE_REPLY, PLAN_REPLY, ScriptedClient, TOPICS_REPLY, pipeline};
use notegen::domain::{ArticleStatus, PlanStatus, Stage, TopicCategory, TopicStatus};
use notegen::llm::LlmError;
use notegen::pipeline::PipelineError;
use tempfile::TempDir;

#[tokio::test]
async fn test_full_chain_topic_plan_article() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::new()
        .reply(TOPICS_REPLY, 1000)
        .reply(PLAN_REPLY, 600)
        .reply(ARTICLE_REPLY, 2000);
    let (pipeline, client) = pipeline(client, &temp.path().join("notegen.db"));

    // Topics
    let topics = pipeline
        .generate_topics(3, &[TopicCategory::BusinessEfficiency, TopicCategory::KnowledgeManagement])
        .await
        .unwrap();
    assert_eq!(topics.record.len(), 3);
    assert_eq!(topics.tokens, 1000);

    let listed = pipeline.state().list_topics(None, None).await.unwrap();
    let priorities: Vec<i64> = listed.iter().map(|t| t.priority).collect();
    assert_eq!(priorities, vec![9, 7, 6]);
    let best = listed[0].clone();
    assert_eq!(best.keywords, vec!["営業日報", "要約", "生成AI"]);

    // Plan
    let plan = pipeline.generate_plan(&best.id).await.unwrap().record;
    assert_eq!(plan.selected_title.as_deref(), Some("営業日報は読まなくていい"));
    assert_eq!(plan.structure.len(), 3);
    let best = pipeline.state().get_topic(&best.id).await.unwrap().unwrap();
    assert_eq!(best.status, TopicStatus::Used);

    // Article
    let article = pipeline.generate_article(&plan.id).await.unwrap();
    assert_eq!(article.tokens, 2000);
    let article = article.record;
    assert_eq!(
        article.content_markdown,
        "# 営業日報は読まなくていい\n\n\
         ## 日報が読まれない理由\n\n日報は書く側も読む側も負担です。\n\n\
         ## 要約プロンプトの作り方\n\nまずは3行要約から始めます。\n\n\
         ## まとめ\n\n要約を仕組みにすれば日報は武器になります。\n\n\
         明日の朝から試してみてください。"
    );
    assert_eq!(article.word_count, article.content_markdown.chars().count());
    assert_eq!(article.status, ArticleStatus::Draft);
    let plan = pipeline.state().get_plan(&plan.id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Approved);

    // The article prompt carried the plan and its topic
    let prompts = client.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("3件"));
    assert!(!prompts[0].contains(TopicCategory::Engineering.label()));
    assert!(prompts[2].contains("## 元トピック情報"));
    assert!(prompts[2].contains("要約プロンプトの作り方"));

    // One log per invocation, each pointing at what it produced
    let logs = pipeline.state().list_logs(None, 10).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.success));
    let by_stage = |stage: Stage| logs.iter().find(|l| l.stage == stage).unwrap();
    assert!(by_stage(Stage::Topic).reference_id.is_none());
    assert_eq!(by_stage(Stage::Plan).reference_id.as_deref(), Some(plan.id.as_str()));
    assert_eq!(by_stage(Stage::Article).reference_id.as_deref(), Some(article.id.as_str()));

    let stats = pipeline.state().stats().await.unwrap();
    assert_eq!(stats.topics_total, 3);
    assert_eq!(stats.topics_used, 1);
    assert_eq!(stats.plans_approved, 1);
    assert_eq!(stats.articles_draft, 1);
    assert_eq!(stats.tokens_total, 3600);
}

#[tokio::test]
async fn test_article_failure_leaves_plan_draft() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::new()
        .reply(TOPICS_REPLY, 10)
        .reply(PLAN_REPLY, 10)
        .fail(LlmError::ApiError {
            status: 529,
            message: r#"{"type":"error","error":{"type":"overloaded_error"}}"#.to_string(),
        });
    let (pipeline, _) = pipeline(client, &temp.path().join("notegen.db"));

    let topic = pipeline.generate_topics(3, &[]).await.unwrap().record.remove(0);
    let plan = pipeline.generate_plan(&topic.id).await.unwrap().record;

    let err = pipeline.generate_article(&plan.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Service { status: Some(529), .. }));
    assert!(err.to_string().contains("overloaded_error"));

    let plan = pipeline.state().get_plan(&plan.id).await.unwrap().unwrap();
    assert_eq!(plan.status, PlanStatus::Draft);
    assert!(pipeline.state().list_articles(None).await.unwrap().is_empty());

    let logs = pipeline.state().list_logs(Some(Stage::Article), 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].success);
    assert!(logs[0].reference_id.is_none());
    assert!(logs[0].error_message.is_some());
}

#[tokio::test]
async fn test_plan_for_missing_topic_logs_only_failure() {
    let temp = TempDir::new().unwrap();
    let (pipeline, client) = pipeline(ScriptedClient::new().reply(PLAN_REPLY, 10), &temp.path().join("notegen.db"));

    let err = pipeline.generate_plan("0000-topic-missing").await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));
    assert!(client.prompts().is_empty());
    assert!(pipeline.state().list_plans(None).await.unwrap().is_empty());

    let logs = pipeline.state().list_logs(None, 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].stage, Stage::Plan);
    assert!(!logs[0].success);
    assert!(logs[0].reference_id.is_none());
}

#[tokio::test]
async fn test_unfenced_reply_is_accepted() {
    let temp = TempDir::new().unwrap();
    let bare = PLAN_REPLY.trim_start_matches("```json").trim_end_matches("```");
    let client = ScriptedClient::new().reply(TOPICS_REPLY, 10).reply(bare, 10);
    let (pipeline, _) = pipeline(client, &temp.path().join("notegen.db"));

    let topic = pipeline.generate_topics(3, &[]).await.unwrap().record.remove(0);
    let plan = pipeline.generate_plan(&topic.id).await.unwrap().record;
    assert_eq!(plan.title_options.len(), 2);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("notegen.db");

    {
        let (pipeline, _) = pipeline(ScriptedClient::new().reply(TOPICS_REPLY, 10), &db);
        pipeline.generate_topics(3, &[]).await.unwrap();
        pipeline.state().shutdown().await.unwrap();
    }

    let (pipeline, _) = pipeline(ScriptedClient::new(), &db);
    let topics = pipeline
        .state()
        .list_topics(Some(TopicStatus::Available), Some(TopicCategory::CustomerMarketing))
        .await
        .unwrap();
    assert_eq!(topics.len(), 1);
    assert_eq!(topics[0].name, "広告コピーのA/Bテスト案出し");
}

#[tokio::test]
async fn test_missing_credential_logs_one_failure() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::new()
        .reply(TOPICS_REPLY, 10)
        .fail(LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()));
    let (pipeline, _) = pipeline(client, &temp.path().join("notegen.db"));

    let topic = pipeline.generate_topics(3, &[]).await.unwrap().record.remove(0);
    let err = pipeline.generate_plan(&topic.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));

    let topic = pipeline.state().get_topic(&topic.id).await.unwrap().unwrap();
    assert_eq!(topic.status, TopicStatus::Available);

    let logs = pipeline.state().list_logs(Some(Stage::Plan), 10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].success);
    assert!(logs[0].error_message.as_deref().unwrap_or_default().contains("ANTHROPIC_API_KEY"));

    let stats = pipeline.state().stats().await.unwrap();
    assert_eq!(stats.generations_succeeded, 1);
    assert_eq!(stats.generations_failed, 1);
}
