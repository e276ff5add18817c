//! # SignalPost — VIP signal channel service
//!
//! Runs the two concurrent halves of the system: the inbound command handler
//! (long-polled from Telegram) and the background broadcast scheduler. Both
//! share one SQLite store; the scheduler never blocks command handling.
//!
//! Usage:
//!   signalpost                         # Use ~/.signalpost/config.toml
//!   signalpost --config ./dev.toml    # Explicit config
//!   signalpost --verbose              # Debug logging

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use signalpost_channels::TelegramChannel;
use signalpost_core::{BusinessCalendar, SignalPostConfig};
use signalpost_scheduler::{SchedulerEngine, default_jobs, spawn_scheduler};
use signalpost_store::SignalStore;
use signalpost_workflow::CommandRouter;

#[derive(Parser)]
#[command(name = "signalpost", version, about = "💹 SignalPost — VIP signal channel service")]
struct Cli {
    /// Config file path (default: ~/.signalpost/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Database path (overrides the config file)
    #[arg(long)]
    db: Option<String>,

    /// Scheduler check interval in seconds
    #[arg(long, default_value = "20")]
    check_interval: u64,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "signalpost=debug"
    } else {
        "signalpost=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => SignalPostConfig::load_from(Path::new(&expand_path(path)))?,
        None => SignalPostConfig::load()?,
    };
    if config.telegram.bot_token.is_empty() {
        anyhow::bail!("telegram.bot_token is not configured");
    }
    if config.admin_id == 0 || config.channel_id == 0 {
        anyhow::bail!("admin_id and channel_id must be configured");
    }

    let db_path = expand_path(cli.db.as_deref().unwrap_or(&config.store.db_path));
    let store = Arc::new(SignalStore::open(Path::new(&db_path))?);
    let calendar = BusinessCalendar::new(config.calendar.holidays.iter().copied());
    tracing::info!(
        "🗄 Store at {db_path}, {} holidays configured",
        calendar.holiday_count()
    );

    let channel = Arc::new(TelegramChannel::new(config.telegram.clone()));
    let me = channel.get_me().await?;
    tracing::info!(
        "🤖 Connected as @{}",
        me.username.as_deref().unwrap_or("unknown")
    );

    // Background broadcasts, isolated from command handling.
    let mut engine = SchedulerEngine::new(
        store.clone(),
        calendar,
        channel.clone(),
        config.channel_id,
    );
    engine.register_all(default_jobs());
    let scheduler = spawn_scheduler(Arc::new(engine), cli.check_interval);

    let router = CommandRouter::new(
        config.admin_id,
        config.channel_id,
        &config.payment_key,
        config.subscription_price,
        store,
        channel.clone(),
    );

    tracing::info!("✅ SignalPost running, waiting for commands");
    // The scheduler ticks on local wall-clock time, so the daily-post marker
    // is keyed by the local date too.
    let mut inbound = channel.clone().start_polling();
    while let Some(msg) = inbound.next().await {
        let today = chrono::Local::now().date_naive();
        if let Some(reply) = router.handle(&msg, chrono::Utc::now(), today).await
            && let Err(e) = channel.send_message(msg.chat_id, &reply).await
        {
            tracing::error!("⚠️ Failed to reply in chat {}: {e}", msg.chat_id);
        }
    }

    scheduler.abort();
    Ok(())
}
