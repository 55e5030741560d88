//! spotarb - Main Entry Point
//!
//! Polls the Sebo service for the ranked opportunity list and feeds each
//! batch through the admission controller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use spotarb::common::channels::shutdown_channel;
use spotarb::common::traits::{
    AdmissionClassifier, AuditSink, Broadcaster, LedgerClient, MarketDataProvider,
};
use spotarb::config::load_config;
use spotarb::engine::{AdmissionController, HeuristicClassifier};
use spotarb::market::RestMarketDataProvider;
use spotarb::persistence::CsvAuditSink;
use spotarb::sebo::SeboClient;
use spotarb::ChannelBroadcaster;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the Sebo API base URL
    #[arg(long)]
    sebo_url: Option<String>,

    /// Override the exchange holding the USDT capital at startup
    #[arg(long)]
    holder_exchange: Option<String>,

    /// Override the seconds between ranked-batch polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting spotarb engine");
    info!("Configuration file: {}", args.config);

    dotenvy::dotenv().ok();

    let mut config = load_config(Some(&args.config))?;
    if let Some(url) = args.sebo_url {
        config.sebo.api_url = url;
    }
    if let Some(holder) = args.holder_exchange {
        config.engine.default_holder_exchange_id = holder;
    }
    if let Some(interval) = args.poll_interval {
        config.engine.poll_interval_seconds = interval;
    }

    let request_timeout = Duration::from_secs(config.settings.request_timeout_seconds);
    let sebo = Arc::new(SeboClient::with_timeout(&config.sebo.api_url, request_timeout)?);
    let market = Arc::new(RestMarketDataProvider::new(request_timeout));
    let classifier = Arc::new(HeuristicClassifier::new(&config.engine));
    let audit = Arc::new(CsvAuditSink::new(&config.settings.audit_csv_path));
    let broadcaster = Arc::new(ChannelBroadcaster::new());

    // Log every decision event at debug level as a built-in observer.
    let mut events = broadcaster.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(
                symbol = %event.symbol,
                outcome = %event.outcome,
                profit = %event.final_profit_usdt,
                "decision event"
            );
        }
    });

    let ledger: Arc<dyn LedgerClient> = sebo.clone();
    let market: Arc<dyn MarketDataProvider> = market;
    let classifier: Arc<dyn AdmissionClassifier> = classifier;
    let audit: Arc<dyn AuditSink> = audit;
    let observer: Arc<dyn Broadcaster> = broadcaster.clone();

    let controller = Arc::new(AdmissionController::new(
        config.engine.clone(),
        ledger,
        Some(market),
        classifier,
        audit,
        observer,
    ));

    let (shutdown_handle, shutdown) = shutdown_channel();
    let poll_interval = Duration::from_secs(config.engine.poll_interval_seconds.max(1));
    let limit = config.sebo.top_opportunity_limit;
    let once = args.once;

    let engine_loop = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.cancelled() => break,
                }

                let batch = match sebo.get_top_opportunities(Some(limit)).await {
                    Ok(batch) => batch,
                    Err(err) => {
                        warn!(error = %err, "failed to fetch ranked opportunities");
                        continue;
                    }
                };
                if batch.is_empty() {
                    debug!("no ranked opportunities this poll");
                    continue;
                }

                let report = controller.run_cycle(&batch, &shutdown).await;
                debug!(?report, "cycle report");

                if once {
                    break;
                }
            }
        })
    };

    if args.once {
        engine_loop.await?;
        shutdown_handle.shutdown();
    } else {
        tokio::signal::ctrl_c().await?;
        info!("Received shutdown signal, cleaning up...");
        shutdown_handle.shutdown();
        engine_loop.await?;
    }

    info!("spotarb stopped");
    Ok(())
}
