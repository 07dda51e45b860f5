mod bot;
mod config;
mod deliver;
mod digest;
mod rank;
mod slack;
mod window;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use crate::bot::MemoriesBot;
use crate::slack::SlackClient;

#[derive(Parser)]
#[command(
    name = "omoide",
    version,
    about = "Reposts each day's most popular Slack messages from years past"
)]
struct Cli {
    #[arg(short, long, default_value = "~/.omoide/config.toml")]
    config: String,
    /// Slack bot token (overrides the config file)
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up today's memories and post them
    Run,
    /// Write a default config file
    Init,
    /// Build today's digest and print it instead of posting
    Preview,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            config::init_config_dir().await?;
            tracing::info!("Initialized {}", config::default_base_dir().display());
        }
        Commands::Run => run(&cli.config, cli.token.as_deref(), false).await?,
        Commands::Preview => run(&cli.config, cli.token.as_deref(), true).await?,
    }
    Ok(())
}

async fn run(config_path: &str, token: Option<&str>, preview: bool) -> Result<()> {
    tracing::info!("Starting job");

    if let Err(e) = run_digests(config_path, token, preview).await {
        tracing::error!("Oops, an error has occurred: {e:#}");
        tracing::error!("Terminated");
        return Err(e);
    }

    tracing::info!("Finished job");
    Ok(())
}

async fn run_digests(config_path: &str, token: Option<&str>, preview: bool) -> Result<()> {
    let cfg = config::load(config_path)?;

    let token = token
        .map(str::to_owned)
        .or_else(|| cfg.slack.bot_token.clone())
        .context("No Slack token: set SLACK_TOKEN or [slack] bot_token in the config")?;

    let mut settings = cfg.digest.clone();
    if preview {
        settings.debug = true;
    }

    let service = Arc::new(SlackClient::new(token));
    let bot = MemoriesBot::new(service, settings)?;

    // Cron hands us "now"; the pipeline only cares about the calendar day.
    let today = Local::now().date_naive();

    for source in &cfg.channels.from {
        bot.run(source, &cfg.channels.to, today).await?;
    }

    Ok(())
}
