//! Polymarket NO-token scanner bot entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use polymarket_scanner::api::{create_router, AppState};
use polymarket_scanner::config::Config;
use polymarket_scanner::exchange::ClobClient;
use polymarket_scanner::market::TokenResolver;
use polymarket_scanner::metrics;
use polymarket_scanner::monitor::TradeMonitor;
use polymarket_scanner::notify::{LogNotifier, Notifier, TelegramNotifier};
use polymarket_scanner::scanner::{OpportunityAggregator, ScanSession, SessionRegistry};
use polymarket_scanner::settings::{ChatSettings, JsonSettingsStore, SettingsStore};
use polymarket_scanner::trading::OrderExecutor;

/// Polymarket NO-token scanner bot.
#[derive(Parser, Debug)]
#[command(name = "polymarket-scanner")]
#[command(about = "Scans Polymarket for near-zero NO tokens and places orders")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scanner service (default).
    Run {
        /// HTTP server port for health/status.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Run one scan pass and print the results.
    Scan {
        /// Price threshold override (e.g. 0.01).
        #[arg(long)]
        threshold: Option<String>,
    },

    /// Monitor trades and orders for one market.
    Monitor {
        /// Condition id of the market.
        condition_id: String,

        /// Token id for price quotes.
        #[arg(long)]
        token_id: Option<String>,

        /// Monitor duration in seconds.
        #[arg(long, default_value = "300")]
        duration: u64,

        /// Poll interval in seconds.
        #[arg(long, default_value = "10")]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("polymarket_scanner=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::Scan { threshold }) => cmd_scan_once(threshold).await,
        Some(Command::Monitor {
            condition_id,
            token_id,
            duration,
            interval,
        }) => cmd_monitor(condition_id, token_id, duration, interval).await,
        Some(Command::Run { port }) => cmd_run(port).await,
        None => cmd_run(None).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POLYMARKET SCANNER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Price Threshold: ${}", config.max_price_no_tokens);
    println!("  Scan Interval: {}s", config.scan_interval_seconds);
    println!("  Order Size: {} shares", config.max_order_size);
    println!("  Auto Order: {}", if config.auto_order { "On" } else { "Off" });
    println!("  Trading Credentials: {}", if config.can_trade() { "present" } else { "absent (alert-only)" });
    let api_creds = config.clob_api_key.is_some()
        && config.clob_secret.is_some()
        && config.clob_pass_phrase.is_some();
    println!("  API Credentials: {}", if api_creds { "present" } else { "derived from key" });
    println!("  Telegram: {}", if config.telegram_bot_token.is_some() { "configured" } else { "not configured" });
    println!("  CLOB Host: {}", config.host);
    println!("  Gamma Endpoint: {}", config.polymarket_gamma_endpoint);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run one scan pass and print the results.
async fn cmd_scan_once(threshold: Option<String>) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let threshold: Decimal = match threshold {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid threshold {}: {}", raw, e))?,
        None => config.max_price_no_tokens,
    };

    println!("Scanning for NO tokens at or below ${}...\n", threshold);

    let aggregator = OpportunityAggregator::new(&config);
    let opportunities = aggregator.find_eligible_markets(threshold).await;

    if opportunities.is_empty() {
        println!("No opportunities found.");
        return Ok(());
    }

    println!("Found {} opportunities:", opportunities.len());
    println!("----------------------------------------------------------------------");
    for op in &opportunities {
        println!("  {}", op.question);
        println!("    NO @ ${}  id: {}", op.no_price, op.display_id());
        if let Some(token_id) = &op.token_id {
            println!("    token: {}", token_id);
        }
        if let Some(url) = &op.url {
            println!("    {}", url);
        }
    }
    println!("----------------------------------------------------------------------");

    Ok(())
}

/// Monitor trades and orders for one market until done or interrupted.
async fn cmd_monitor(
    condition_id: String,
    token_id: Option<String>,
    duration: u64,
    interval: u64,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let client = Arc::new(ClobClient::new(&config));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let monitor = TradeMonitor::new(
        config.telegram_chat_id.unwrap_or(0),
        condition_id,
        token_id,
        Duration::from_secs(interval),
        Duration::from_secs(duration),
        client,
        notifier,
    );

    let token = CancellationToken::new();
    let mut task = tokio::spawn(monitor.run(token.clone()));

    tokio::select! {
        result = &mut task => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown requested, cancelling monitor");
            token.cancel();
            let _ = task.await;
        }
    }

    Ok(())
}

/// Run the scanner service.
async fn cmd_run(port_override: Option<u16>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Price threshold: ${}", config.max_price_no_tokens);
    info!("Scan interval: {}s", config.scan_interval_seconds);
    info!(
        "Mode: {}",
        if config.can_trade() { "TRADING ENABLED" } else { "ALERT-ONLY" }
    );

    // Prometheus exporter for the metrics recorded across the pipeline
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!("Failed to install Prometheus exporter: {}", e);
    }

    // Shared state and collaborators
    let registry = Arc::new(SessionRegistry::new());
    let settings: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::new(
        config.settings_dir.clone(),
        ChatSettings::defaults(&config),
    ));
    let notifier: Arc<dyn Notifier> = match &config.telegram_bot_token {
        Some(token) => Arc::new(TelegramNotifier::new(token)),
        None => {
            info!("No Telegram token configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    };
    let aggregator = Arc::new(OpportunityAggregator::new(&config));
    let executor = if config.can_trade() {
        Some(Arc::new(OrderExecutor::new(
            Arc::new(ClobClient::new(&config)),
            TokenResolver::new(&config),
        )))
    } else {
        None
    };

    // HTTP status facade
    let port = port_override.unwrap_or(config.api_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(AppState {
        registry: registry.clone(),
        settings: settings.clone(),
        scan_interval_seconds: config.scan_interval_seconds,
    });

    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Scan session for the configured chat
    let chat_id = config.telegram_chat_id.unwrap_or(0);
    let scan_interval = Duration::from_secs(config.scan_interval_seconds);
    {
        let aggregator = aggregator.clone();
        let executor = executor.clone();
        let settings = settings.clone();
        let notifier = notifier.clone();
        let session_registry = registry.clone();
        registry.start_scan(chat_id, move |token| {
            let session = ScanSession::new(
                chat_id,
                scan_interval,
                aggregator,
                executor,
                settings,
                notifier,
                session_registry,
            );
            tokio::spawn(session.run(token))
        });
    }

    info!("Scanner started for chat {}", chat_id);

    shutdown_signal().await;
    info!("Shutting down...");
    registry.stop_all();

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
