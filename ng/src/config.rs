//! Notegen configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main notegen configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Completion service configuration
    pub llm: LlmConfig,

    /// Per-stage generation limits
    pub pipeline: PipelineConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the completion-service credential is present.
    pub fn validate(&self) -> Result<()> {
        if std::env::var(&self.llm.api_key_env).map(|v| v.trim().is_empty()).unwrap_or(true) {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.pipeline.max_topic_count == 0 {
            return Err(eyre::eyre!("pipeline.max-topic-count must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .notegen.yml
        let local_config = PathBuf::from(".notegen.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/notegen/notegen.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed since nothing can be logged yet.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(".notegen.yml"))
                .chain(Self::user_config_path())
                .collect(),
        };
        candidates
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("notegen").join("notegen.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Value of the anthropic-version header
    #[serde(rename = "anthropic-version")]
    pub anthropic_version: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            timeout_ms: 300_000,
        }
    }
}

/// Per-stage generation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Output token ceiling for topic generation
    #[serde(rename = "topic-max-tokens")]
    pub topic_max_tokens: u32,

    /// Output token ceiling for plan generation
    #[serde(rename = "plan-max-tokens")]
    pub plan_max_tokens: u32,

    /// Output token ceiling for article generation
    #[serde(rename = "article-max-tokens")]
    pub article_max_tokens: u32,

    /// Topic count used when a request does not specify one
    #[serde(rename = "default-topic-count")]
    pub default_topic_count: u32,

    /// Largest topic count a single request may ask for
    #[serde(rename = "max-topic-count")]
    pub max_topic_count: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topic_max_tokens: 8000,
            plan_max_tokens: 6000,
            article_max_tokens: 8000,
            default_topic_count: 20,
            max_topic_count: 50,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        // Use XDG data directory (~/.local/share/notegen on Linux)
        let database = dirs::data_dir()
            .map(|d| d.join("notegen"))
            .unwrap_or_else(|| PathBuf::from(".notegen"))
            .join("notegen.db")
            .to_string_lossy()
            .into_owned();

        Self { database }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory searched for `{topic,plan,article}.pmt` overrides
    pub dir: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            dir: ".notegen/prompts".to_string(),
        }
    }
}
