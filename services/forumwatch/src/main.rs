//! Forumwatch CLI

use std::path::PathBuf;

use clap::Parser;
use forumwatch::{load_config, Config, ForumWatchBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "forumwatch")]
#[command(about = "Watch a forum page and report new posts to Telegram")]
#[command(version)]
struct Args {
    /// JSON configuration file; built-in defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record store file (overrides `store.path`)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// API port (overrides config file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Do not resume a run left over from the previous process
    #[arg(long)]
    no_resume: bool,

    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

/// Layer the config file, environment and command line, in that order
fn resolve_config(args: &Args) -> forumwatch::Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    config.apply_env()?;

    if let Some(path) = &args.store {
        config.store.path = Some(path.clone());
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_resume {
        config.monitor.resume_on_boot = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = resolve_config(&args)?;
    tracing::info!(
        "Forumwatch on {}:{}, seed forum {} every {} min, Telegram credentials {}",
        config.server.bind_address,
        config.server.port,
        config.seed.forum_url,
        config.seed.check_interval_minutes,
        if config.seed.telegram_bot_token.is_some() && config.seed.telegram_chat_id.is_some() {
            "seeded"
        } else {
            "not seeded"
        }
    );

    let service = ForumWatchBuilder::new(config).build().await?;
    service.start().await?;
    Ok(())
}
