//! Shared helpers for notegen integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notegen::config::PipelineConfig;
use notegen::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, StopReason, TokenUsage};
use notegen::pipeline::Pipeline;
use notegen::prompts::PromptLoader;
use notegen::state::StateManager;

/// Completion client that replays scripted replies and records prompts
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply worth `tokens` tokens
    pub fn reply(self, text: &str, tokens: u64) -> Self {
        self.replies.lock().unwrap().push_back(Ok(CompletionResponse {
            content: text.to_string(),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage {
                input_tokens: tokens / 2,
                output_tokens: tokens - tokens / 2,
            },
        }));
        self
    }

    /// Queue a failure
    pub fn fail(self, error: LlmError) -> Self {
        self.replies.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Some(prompt) = request.prompt() {
            self.prompts.lock().unwrap().push(prompt.to_string());
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::InvalidResponse("script exhausted".to_string())))
    }
}

/// Pipeline over an on-disk store at `db_path`
pub fn pipeline(client: ScriptedClient, db_path: &Path) -> (Pipeline, Arc<ScriptedClient>) {
    let client = Arc::new(client);
    let state = StateManager::spawn(db_path).expect("Failed to spawn state manager");
    let prompts = Arc::new(PromptLoader::embedded_only().expect("Failed to load prompts"));
    let pipeline = Pipeline::new(client.clone(), state, prompts, PipelineConfig::default());
    (pipeline, client)
}

pub const TOPICS_REPLY: &str = r#"以下が提案です。

```json
[
  {
    "name": "営業日報をAIで要約する",
    "category": "業務効率化（営業、経理、人事、総務など）",
    "priority": 9,
    "keywords": "営業日報, 要約, 生成AI",
    "targetAudience": "営業マネージャー",
    "angle": "毎朝5分で部下の状況を把握する"
  },
  {
    "name": "社内FAQボットの育て方",
    "category": "組織運営・ナレッジマネジメント",
    "priority": 6,
    "keywords": "FAQ, ナレッジ",
    "targetAudience": "情報システム部門",
    "angle": "最初の100問をどう集めるか"
  },
  {
    "name": "広告コピーのA/Bテスト案出し",
    "category": "顧客対応・マーケティング",
    "priority": 7,
    "keywords": "広告, コピーライティング",
    "targetAudience": "マーケター",
    "angle": "案出しを10倍速くする"
  }
]
```"#;

pub const PLAN_REPLY: &str = r#"```json
{
  "titleOptions": ["営業日報は読まなくていい", "AI要約で日報の山を片付ける"],
  "lead": "毎朝の日報チェックに30分かけていませんか。",
  "structure": [
    {"heading": "日報が読まれない理由", "content": "量と粒度の問題", "estimatedLength": 600},
    {"heading": "要約プロンプトの作り方", "content": "3行要約と懸念点抽出", "estimatedLength": 1200},
    {"heading": "運用のコツ", "content": "週次で見直す", "estimatedLength": 800}
  ],
  "targetLength": 3500
}
```"#;

pub const ARTICLE_REPLY: &str = r#"```json
{
  "title": "営業日報は読まなくていい",
  "sections": [
    {"heading": "日報が読まれない理由", "content": "日報は書く側も読む側も負担です。"},
    {"heading": "要約プロンプトの作り方", "content": "まずは3行要約から始めます。"}
  ],
  "summary": "要約を仕組みにすれば日報は武器になります。",
  "cta": "明日の朝から試してみてください。"
}
```"#;
