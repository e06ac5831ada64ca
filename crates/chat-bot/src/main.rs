//! Chat bot - main entry point.
//!
//! Reads chat lines from stdin and posts replies to stdout.

use anyhow::Context;
use chat_bot::bot::{Bot, ChatBot};
use chat_bot::commands::{
    load_counter_handlers, load_mapping_handlers, register_admin_handlers, HelpQueueHandler,
};
use chat_bot::config::Config;
use chat_bot::error::AppResult;
use chat_bot::scheduler::{ActivityGate, TimerScheduler};
use chat_client::{ConsoleReceiver, ConsoleTransport};
use state_store::SnapshotStore;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::signal;
use tokio_stream::StreamExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Initialize logging
    init_logging(&config.bot.log_level);

    info!("Starting chat bot {}...", config.bot.username);

    let store = match config.storage.snapshot_path() {
        Some(path) => {
            let store = SnapshotStore::open(path.clone()).await?;
            info!("State snapshot at {}", path.display());
            store
        }
        None => {
            info!("No storage path configured, state is kept in memory");
            SnapshotStore::in_memory()
        }
    };

    let activity = Arc::new(ActivityGate::new(config.timers.activity_window));
    let bot = Arc::new(ChatBot::new(
        &config.bot.username,
        config.bot.trigger,
        Arc::new(ConsoleTransport::stdout()),
        Arc::new(store),
        activity.clone(),
    )?);

    bot.join(&config.bot.channel).await?;

    // Stored commands first, so built-in commands win on a name clash
    let counters = load_counter_handlers(bot.as_ref()).await?;
    let mappings = load_mapping_handlers(bot.as_ref()).await?;
    info!("Loaded {} counters and {} mappings", counters, mappings);

    bot.register_handler(
        &config.help.command,
        Arc::new(HelpQueueHandler::new(
            &config.help.command,
            &config.help.paste_url,
        )),
    )
    .await;
    register_admin_handlers(bot.as_ref()).await;
    info!("Registered commands: {:?}", bot.handlers().names().await);

    let scheduler = TimerScheduler::new(activity, config.timers.tick_interval);
    let timers = scheduler.spawn(bot.clone());

    info!("Listening on #{} (trigger '{}')", config.bot.channel, config.bot.trigger);

    let receiver = ConsoleReceiver::new(BufReader::new(tokio::io::stdin()), &config.bot.channel);
    let mut stream = Box::pin(receiver.stream());

    // Main message loop
    loop {
        tokio::select! {
            next = stream.next() => match next {
                Some(message) => {
                    bot.dispatch(&message).await;
                }
                None => {
                    info!("Input closed");
                    break;
                }
            },
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Shutting down...");
    timers.abort();
    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries chat output
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
