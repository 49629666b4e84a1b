//! reactrole CLI - Offline maintenance of reaction-role binding stores
//!
//! Operators use this to:
//! - List and inspect persisted bindings
//! - Disable or remove a binding while the engine is stopped
//! - Validate a store file before starting the engine

use anyhow::Context;
use clap::{Parser, Subcommand};
use reactrole_store::JsonFileStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

use commands::bindings::{self, BindingCommands};
use config::CliConfig;
use output::{print_error, OutputFormat};

/// reactrole CLI application
#[derive(Parser)]
#[command(name = "reactrole")]
#[command(about = "reactrole - Inspect and maintain reaction-role bindings", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "REACTROLE_CONFIG")]
    config: Option<String>,

    /// Binding store file, overrides `store.path`
    #[arg(short, long, env = "REACTROLE_STORE_FILE")]
    store: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Log level, overrides `logging.level`
    #[arg(long, env = "REACTROLE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "REACTROLE_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Binding(BindingCommands),

    /// Show the effective configuration
    Config,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().without_time().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Override with CLI args
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    init_tracing(&config.logging.level, config.logging.json);

    match cli.command {
        Commands::Binding(command) => {
            let store = JsonFileStore::open(&config.store.path)
                .await
                .with_context(|| format!("Failed to open store at {}", config.store.path))?;
            bindings::execute(command, &store, cli.output).await
        }
        Commands::Config => output::print_single(&config),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
