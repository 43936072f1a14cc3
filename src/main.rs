use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tokio::time::{sleep, Duration};
use volbreak::api::{Credentials, UpbitClient};
use volbreak::{Engine, Settings, TracingReporter};

#[derive(Parser, Debug)]
#[command(name = "volbreak")]
#[command(about = "Volatility breakout trader for KRW markets", long_about = None)]
struct Args {
    /// TOML config file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single tick and exit
    #[arg(long)]
    once: bool,

    /// Plan and report without placing or cancelling orders
    #[arg(long)]
    dry_run: bool,

    /// Seconds to sleep between ticks (overrides runner.poll_interval_secs)
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;

    let credentials = Credentials::new(
        settings.account.access_key.clone(),
        settings.account.secret_key.clone(),
    );
    let client = UpbitClient::new(settings.runner.api_base_url.clone(), credentials)
        .context("Failed to build exchange client")?;

    let mut engine =
        Engine::from_settings(client, TracingReporter, &settings).with_dry_run(args.dry_run);

    let interval = Duration::from_secs(
        args.interval_secs
            .unwrap_or(settings.runner.poll_interval_secs)
            .max(1),
    );

    tracing::info!("🚀 volbreak starting");
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Strategy: {}", engine.strategy_name());
    tracing::info!("  Targets: {}", settings.strategy.targets.join(", "));
    tracing::info!("  K (default): {}", settings.strategy.k_value);
    tracing::info!("  Order amount: {}", settings.strategy.order_amount);
    tracing::info!("  Max coins: {}", settings.strategy.max_coin);
    tracing::info!(
        "  Liquidation window: {:02}:00 + {} min (UTC)",
        settings.strategy.start_hour,
        settings.strategy.ask_period_minutes
    );
    if settings.strategy.stop_loss_enabled {
        tracing::info!("  Stop-loss: {}%", settings.strategy.stop_loss);
    }
    if let Some(probe) = &settings.health_check {
        tracing::info!("  Health check: {}", probe.market);
    }
    if args.dry_run {
        tracing::warn!("  DRY RUN: no orders will be sent");
    }

    if args.once {
        if let Err(e) = engine.run_tick(Utc::now()).await {
            tracing::error!("Tick failed: {}", e);
        }
        return Ok(());
    }

    tracing::info!("\nPress Ctrl+C to stop...\n");

    // Sleep-then-run: a tick never overlaps the previous one
    loop {
        if let Err(e) = engine.run_tick(Utc::now()).await {
            tracing::warn!("Tick failed, retrying next interval: {}", e);
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = sleep(interval) => {}
        }
    }

    tracing::info!("👋 volbreak stopped");
    Ok(())
}

fn setup_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("volbreak=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
