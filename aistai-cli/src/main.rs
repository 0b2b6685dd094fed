//! CLI entry point for aistai

use aistai_agent::{ChatRouter, Completion, CompletionRelay, RelaySettings};
use aistai_channels::TelegramHandler;
use aistai_core::config::{Config, ConfigLoader, TransportMode};
use aistai_core::logging::init_logging;
use aistai_core::{ModelRegistry, SessionStore, UserId};
use aistai_providers::OpenAIClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Session key used by `aistai ask`
const CLI_USER_ID: UserId = 0;

#[derive(Parser)]
#[command(name = "aistai")]
#[command(about = "Telegram chat relay for OpenAI-compatible models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run the Telegram bot (default)
    Run {
        /// Update delivery mode, overrides telegram.mode
        #[arg(long)]
        mode: Option<TransportMode>,
    },
    /// Send one message to the completion API without Telegram
    Ask {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Model code to use (e.g. gpt5_instance)
        #[arg(long)]
        model: Option<String>,
    },
    /// Show configuration and model table
    Status,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Local runs keep secrets in .env; real environment variables still win
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    match cli.command.unwrap_or(Commands::Run { mode: None }) {
        Commands::Run { mode } => run_bot(&config_loader, mode).await?,
        Commands::Ask { message, model } => run_ask(&config_loader, &message, model).await?,
        Commands::Status => run_status(&config_loader)?,
        Commands::Init { force } => run_init(&config_loader, force)?,
    }

    Ok(())
}

/// Build the relay from configuration
fn build_relay(config: &Config) -> Result<(Arc<ModelRegistry>, CompletionRelay)> {
    let registry = Arc::new(ModelRegistry::new().with_overrides(&config.models.overrides));
    let provider = OpenAIClient::from_config(&config.openai, registry.fallback_model())
        .context("Failed to create completion client")?;
    let relay = CompletionRelay::new(
        Arc::new(provider),
        registry.clone(),
        RelaySettings::from(&config.chat),
    );
    Ok((registry, relay))
}

fn build_router(config: &Config) -> Result<ChatRouter> {
    let (registry, relay) = build_relay(config)?;
    let sessions = Arc::new(SessionStore::new(
        config.chat.default_model.clone(),
        config.chat.max_sessions,
    ));
    Ok(ChatRouter::new(sessions, registry, relay))
}

async fn run_bot(loader: &ConfigLoader, mode: Option<TransportMode>) -> Result<()> {
    let mut config = loader.load_unchecked()?;
    if let Some(mode) = mode {
        config.telegram.mode = mode;
    }
    aistai_core::config::validate_config(&config).context("Invalid configuration")?;

    let _guard = init_logging(&config.logging);

    info!(
        "AistaiBot starting: mode={}, default model={}, history limit={}",
        config.telegram.mode.as_str(),
        config.chat.default_model,
        config.chat.history_limit
    );

    let router = Arc::new(build_router(&config)?);
    let handler = TelegramHandler::new(&config.telegram, router);

    println!("{}", style("AistaiBot is running. Press Ctrl+C to stop.").green());

    if let Err(e) = handler.run().await {
        error!("Telegram bot failed: {}", e);
        return Err(e).context("Telegram bot stopped with an error");
    }

    println!("{}", style("AistaiBot stopped.").green());
    Ok(())
}

async fn run_ask(loader: &ConfigLoader, message: &str, model: Option<String>) -> Result<()> {
    let config = loader.load_unchecked()?;
    if config.openai.api_key.trim().is_empty() {
        anyhow::bail!("openai.api_key is required (set OPENAI_API_KEY)");
    }

    let _guard = init_logging(&config.logging);

    let (registry, relay) = build_relay(&config)?;
    let sessions = SessionStore::new(config.chat.default_model.clone(), 1);
    let session = sessions.get_or_create(CLI_USER_ID);
    if let Some(code) = model {
        session.lock().await.set_model(code);
    }

    let code = session.lock().await.model_code.clone();
    println!(
        "{} {} ({})",
        style("Processing with").cyan(),
        registry.display_name(&code),
        registry.resolve(&code)
    );

    match relay.respond(&session, message).await {
        Completion::Replied(text) => {
            println!("\n{}", style("Response:").bold());
            println!("{}", text);
            Ok(())
        }
        Completion::Failed { error, notice } => {
            println!("\n{}", style(&notice).yellow());
            anyhow::bail!("Completion failed ({}): {}", error.summary(), error)
        }
    }
}

fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load_unchecked()?;

    println!("{}", style("AistaiBot Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    let file_state = if loader.config_path().exists() {
        style("present").green()
    } else {
        style("missing (defaults and environment only)").dim()
    };
    println!("  Config file: {}", file_state);
    match aistai_core::config::validate_config(&config) {
        Ok(()) => println!("  Validation: {}", style("ok").green()),
        Err(e) => println!("  Validation: {}", style(e).red()),
    }
    println!();

    println!("{}", style("Telegram:").bold());
    println!("  Token: {}", mask_secret(&config.telegram.token));
    println!("  Mode: {}", config.telegram.mode.as_str());
    if config.telegram.mode == TransportMode::Webhook {
        let url = config.telegram.webhook.endpoint_url("<token>");
        println!("  Webhook: {} (port {})", url, config.telegram.webhook.port);
    }
    println!();

    println!("{}", style("Completion API:").bold());
    println!("  Base URL: {}", config.openai.api_base);
    println!("  API key: {}", mask_secret(&config.openai.api_key));
    println!("  Timeout: {}s", config.openai.timeout_secs);
    println!();

    println!("{}", style("Chat:").bold());
    println!("  Default model: {}", config.chat.default_model);
    println!("  History limit: {}", config.chat.history_limit);
    println!("  Temperature: {}", config.chat.temperature);
    println!("  Record failures: {}", config.chat.record_failures);
    println!();

    println!("{}", style("Models:").bold());
    let registry = ModelRegistry::new().with_overrides(&config.models.overrides);
    for entry in registry.entries() {
        let marker = if entry.code == config.chat.default_model {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!(
            "  {} {:<14} {:<16} -> {}",
            marker, entry.code, entry.display_name, entry.provider_model
        );
    }
    println!("  Unknown codes -> {}", registry.fallback_model());

    Ok(())
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let path = loader.config_path();
    if path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("!").yellow().bold(),
            path.display()
        );
        return Ok(());
    }

    loader
        .save(&Config::default())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "{} Wrote {}",
        style("✓").green().bold(),
        path.display()
    );
    println!("\nNext steps:");
    println!("  1. Set TELEGRAM_TOKEN and OPENAI_API_KEY (environment or .env)");
    println!("  2. {}", style("aistai run").cyan());
    Ok(())
}

/// Show only enough of a secret to tell keys apart
fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return style("not set").red().to_string();
    }
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{}****", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::try_parse_from(["aistai"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config_dir.is_none());
    }

    #[test]
    fn test_run_mode_flag() {
        let cli = Cli::try_parse_from(["aistai", "run", "--mode", "webhook"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                mode: Some(TransportMode::Webhook)
            })
        );

        assert!(Cli::try_parse_from(["aistai", "run", "--mode", "smoke-signals"]).is_err());
    }

    #[test]
    fn test_ask_arguments() {
        let cli = Cli::try_parse_from([
            "aistai",
            "--config-dir",
            "/tmp/aistai",
            "ask",
            "-m",
            "hello",
            "--model",
            "gpt5_syncing",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/aistai")));
        assert_eq!(
            cli.command,
            Some(Commands::Ask {
                message: "hello".to_string(),
                model: Some("gpt5_syncing".to_string()),
            })
        );

        assert!(Cli::try_parse_from(["aistai", "ask"]).is_err());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk-abcdefghijkl"), "sk-a****");
        assert!(mask_secret("").contains("not set"));
    }

    #[test]
    fn test_build_router_uses_chat_defaults() {
        let mut config = Config::default();
        config.chat.default_model = "gpt5_instance".to_string();
        let router = build_router(&config).unwrap();
        assert!(router.sessions().is_empty());
        assert_eq!(router.sessions().default_model(), "gpt5_instance");
        assert_eq!(router.registry().resolve("gpt5_instance"), "gpt-4o-mini");
    }

    #[test]
    fn test_build_relay_applies_model_overrides() {
        let mut config = Config::default();
        config
            .models
            .overrides
            .insert("gpt5_instance".to_string(), "gpt-5-mini".to_string());
        let (registry, relay) = build_relay(&config).unwrap();
        assert_eq!(registry.resolve("gpt5_instance"), "gpt-5-mini");
        assert_eq!(relay.settings().history_limit, 30);
    }

    #[test]
    fn test_init_writes_default_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ConfigLoader::with_dir(dir.path().join("conf"));

        run_init(&loader, false).unwrap();
        let written = std::fs::read_to_string(loader.config_path()).unwrap();
        assert!(written.contains("\"history_limit\": 30"));

        std::fs::write(loader.config_path(), "{}").unwrap();
        run_init(&loader, false).unwrap();
        assert_eq!(std::fs::read_to_string(loader.config_path()).unwrap(), "{}");

        run_init(&loader, true).unwrap();
        assert!(std::fs::read_to_string(loader.config_path())
            .unwrap()
            .contains("\"default_model\": \"gpt4o\""));
    }
}
