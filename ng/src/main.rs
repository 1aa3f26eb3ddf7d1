//! Notegen - topic, plan, and article generation pipeline
//!
//! CLI entry point. Each invocation opens the store, runs one request
//! through the invocation surface, and prints the JSON response.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use notegen::api::{Api, ApiResponse};
use notegen::cli::Cli;
use notegen::config::Config;
use notegen::llm::create_client;
use notegen::pipeline::Pipeline;
use notegen::prompts::PromptLoader;
use notegen::state::StateManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Can't log here yet, logging isn't initialized
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notegen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("notegen.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Wire the store, client, prompts, and pipeline behind the invocation surface
fn build_api(config: &Config) -> Result<(Api, StateManager)> {
    debug!(database = %config.storage.database, "build_api: called");
    let state = StateManager::spawn(&config.storage.database).context("Failed to open store")?;
    let llm = create_client(&config.llm).context("Failed to create completion client")?;

    let prompt_dir = Path::new(&config.prompts.dir);
    let prompts = PromptLoader::new(Some(prompt_dir)).context("Failed to load prompt templates")?;

    let pipeline = Pipeline::new(llm, state.clone(), Arc::new(prompts), config.pipeline.clone());
    Ok((Api::new(pipeline), state))
}

fn print_response(response: &ApiResponse) -> Result<()> {
    let pretty = serde_json::to_string_pretty(&response.body).context("Failed to format response")?;
    println!("{}", pretty);
    if !response.is_success() {
        let message = response.error_message().unwrap_or("request failed");
        eprintln!("{} {}", format!("Error ({}):", response.status).red().bold(), message.red());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(database) = &cli.database {
        config.storage.database = database.to_string_lossy().into_owned();
    }
    if let Err(e) = config.validate() {
        // Generation requests record the failure themselves
        warn!(error = %e, "Configuration incomplete");
    }
    info!(model = %config.llm.model, database = %config.storage.database, "notegen loaded config");

    let request = cli.command.to_request()?;
    debug!(method = %request.method, path = %request.path, "main: dispatching request");

    let (api, state) = build_api(&config)?;
    let response = api.handle(request).await;
    info!(status = response.status, "main: request finished");

    if let Err(e) = state.shutdown().await {
        warn!(error = %e, "main: state manager already stopped");
    }

    print_response(&response)?;
    if !response.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
