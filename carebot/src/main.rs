//! carebot: console front end
//!
//! Reads one JSON message per line from stdin and writes replies to stdout.
//! Logs go to stderr.

use std::sync::Arc;

use clap::Parser;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carebot::channel::ConsoleChannel;
use carebot::{BackendKind, CareBot, Cli, Config};
use carebot_store::{KeyValueBackend, MemoryBackend, RedisBackend, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("carebot={},info", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_cli(&cli)?;
    info!("Config file: {}", cli.config.display());
    info!("Namespace: {}", config.bot.namespace);

    let backend: Arc<dyn KeyValueBackend> = match config.backend.kind {
        BackendKind::Memory => {
            info!("Using in-memory backend; state is lost on exit");
            Arc::new(MemoryBackend::new())
        }
        BackendKind::Redis => {
            info!("Using Redis backend at {}", config.backend.redis_url);
            Arc::new(RedisBackend::new(&config.backend.redis_url)?)
        }
    };

    let bot = CareBot::build(Store::new(backend), &config);
    bot.start().await?;
    let sweeper = bot.spawn_draft_sweeper(config.draft_ttl());

    let channel = ConsoleChannel::new(bot.dispatcher(), config.bot.username.clone());
    let accepted = channel
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    sweeper.abort();
    info!("Input closed, {} message(s) handled", accepted);
    Ok(())
}
