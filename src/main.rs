mod autoupdate;
mod logging;
mod orders;
#[cfg(test)]
mod testutil;

use autoupdate::{AutoupdateService, CronSchedule};
use chrono::Utc;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use orders::OrderService;
use passtrack_core::config;
use passtrack_core::traits::StatusSource;
use passtrack_core::uid::{is_valid_uid, parse_short_uid_from_uid};
use passtrack_midpass::{MidpassClient, ProxyRotator};
use passtrack_store::Store;
use passtrack_telegram::TelegramNotifier;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "passtrack",
    version,
    about = "Passport application status tracking bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: scheduled autoupdate polling and notifications.
    Start,
    /// Check configuration, storage, and schedule health.
    Status,
    /// One-shot status lookup of a single UID (no storage writes).
    Check {
        /// 25-digit application number.
        uid: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start => start(&cli.config).await,
        Commands::Status => status(&cli.config).await,
        Commands::Check { uid } => check(&cli.config, &uid).await,
    }
}

async fn start(config_path: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;
    let _log_guard = logging::init(&cfg.log);

    if cfg.telegram.bot_token.is_empty() {
        anyhow::bail!("Telegram bot_token is empty. Set it in {config_path} under [telegram].");
    }

    let store = Store::new(&cfg.store).await?;
    let rotator = ProxyRotator::new(cfg.upstream.endpoints.clone())?;
    let client = MidpassClient::new(Duration::from_secs(cfg.upstream.timeout_secs))?;
    let notifier = Arc::new(TelegramNotifier::new(
        cfg.telegram.clone(),
        PathBuf::from(&cfg.images.dir),
    ));
    let orders = Arc::new(OrderService::new(
        store.clone(),
        Arc::new(client),
        rotator,
        cfg.limits.max_orders_per_user,
    ));
    let service = AutoupdateService::new(
        store,
        orders,
        notifier,
        &cfg.autoupdate,
        cfg.upstream.endpoints.clone(),
    )?;

    info!(
        "passtrack starting | {} endpoint(s) | {} schedule(s) | tz {}",
        cfg.upstream.endpoints.len(),
        service.schedules().len(),
        service.timezone()
    );

    tokio::select! {
        result = service.run_forever() => result?,
        _ = tokio::signal::ctrl_c() => info!("passtrack: shutdown signal received"),
    }

    Ok(())
}

async fn status(config_path: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;

    println!("passtrack — status\n");
    println!("Config: {config_path}");
    println!(
        "Telegram: {}",
        if cfg.telegram.bot_token.is_empty() {
            "missing bot_token"
        } else {
            "configured"
        }
    );

    println!("Database: {}", cfg.store.db_path);
    match std::fs::metadata(&cfg.store.db_path) {
        Ok(meta) => println!("  exists, {} bytes", meta.len()),
        Err(_) => println!("  not created yet"),
    }

    println!(
        "Upstream endpoints (timeout {}s):",
        cfg.upstream.timeout_secs
    );
    for endpoint in &cfg.upstream.endpoints {
        println!("  {endpoint}");
    }

    let tz: Tz = cfg
        .autoupdate
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("bad timezone: {e}"))?;
    let now = Utc::now().with_timezone(&tz);

    println!("Schedules ({}):", cfg.autoupdate.timezone);
    for expr in &cfg.autoupdate.schedules {
        let schedule = CronSchedule::parse(expr)?;
        match schedule.next_after(now) {
            Some(at) => println!("  {expr}  -> next {}", at.format("%Y-%m-%d %H:%M")),
            None => println!("  {expr}  -> never fires"),
        }
    }

    Ok(())
}

async fn check(config_path: &str, uid: &str) -> anyhow::Result<()> {
    let cfg = config::load(config_path)?;

    if !is_valid_uid(uid) {
        anyhow::bail!("'{uid}' is not a valid application number (25 digits starting with 2000)");
    }

    let rotator = ProxyRotator::new(cfg.upstream.endpoints.clone())?;
    let client = MidpassClient::new(Duration::from_secs(cfg.upstream.timeout_secs))?;
    let endpoint = rotator.next_endpoint();

    println!("Checking {} via {endpoint}...", parse_short_uid_from_uid(uid));
    match client.fetch(&endpoint, uid).await {
        Ok(dto) => {
            println!(
                "  Reception date: {}",
                dto.reception_date.as_deref().unwrap_or("-")
            );
            println!("  Progress: {}%", dto.internal_status.percent);
            println!("  Internal status: {}", dto.internal_status.name);
            println!("  Status: {}", dto.passport_status.name);
        }
        Err(e) => anyhow::bail!("lookup failed: {e}"),
    }

    Ok(())
}
