use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use feedcast::config::Config;
use feedcast::content::AnthropicClient;
use feedcast::cycle::CycleDriver;
use feedcast::feed::HttpFeedSource;
use feedcast::publish::{DiscordPublisher, DryRunPublisher, Publisher};
use feedcast::scheduler;
use feedcast::store::SeenStore;

#[derive(Parser, Debug)]
#[command(name = "feedcast", about = "Posts AI-rewritten RSS entries to a Discord channel")]
struct Args {
    /// TOML config file (optional; environment variables override it)
    #[arg(long, value_name = "FILE", default_value = "feedcast.toml")]
    config: PathBuf,

    /// State file for processed entries (overrides config)
    #[arg(long, value_name = "FILE")]
    state: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Log posts instead of sending them to Discord
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedcast=info")),
        )
        .init();

    let args = Args::parse();

    match dotenvy::from_filename("config.env") {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load config.env"),
    }

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config file {}", args.config.display()))?;
    config
        .apply_env(|key| std::env::var(key).ok())
        .context("Invalid environment configuration")?;
    if let Some(state) = args.state {
        config.state_file = state;
    }
    let credentials = config.validate().context("Refusing to start")?;
    tracing::debug!(config = ?config, "Resolved configuration");

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedcast/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut transformer = AnthropicClient::new(client.clone(), credentials.anthropic_api_key)
        .with_model(config.model.clone());
    if let Some(base) = &config.anthropic_base_url {
        transformer = transformer.with_base_url(base.clone());
    }

    let channel_id = config
        .discord_channel_id
        .clone()
        .context("DISCORD_CHANNEL_ID not set")?;
    let publisher: Arc<dyn Publisher> = if args.dry_run {
        Arc::new(DryRunPublisher)
    } else {
        let mut discord =
            DiscordPublisher::new(client.clone(), credentials.discord_bot_token, channel_id);
        if let Some(base) = &config.discord_base_url {
            discord = discord.with_base_url(base.clone());
        }
        Arc::new(discord)
    };

    let driver = CycleDriver::new(
        config.feed_urls.clone(),
        Arc::new(HttpFeedSource::new(client)),
        Arc::new(transformer),
        publisher,
        config.cycle_settings(),
    );
    let mut store = SeenStore::load(&config.state_file);

    tracing::info!(
        feeds = driver.feeds().len(),
        interval_minutes = config.check_interval_minutes,
        validation = config.enable_content_validation,
        dry_run = args.dry_run,
        "Starting feedcast"
    );

    if args.once {
        let report = driver.run_cycle(&mut store, Utc::now()).await;
        println!("Posted {} entries", report.posted());
        return Ok(());
    }

    let period: Duration = config.check_interval();
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };

    scheduler::run(&driver, &mut store, period, shutdown).await;
    Ok(())
}
