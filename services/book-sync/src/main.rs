use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use book_sync::binance::{BinanceSnapshotSource, BinanceStreamConnector};
use book_sync::{spawn, ServiceConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use types::ids::InstrumentId;

/// Keep a local order book in sync with Binance and log the top of book.
#[derive(Debug, Parser)]
#[command(name = "book-sync", version)]
struct Args {
    /// Instrument symbol, e.g. BTCUSDT.
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    /// JSON config file; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Levels per side to log.
    #[arg(long, default_value_t = 5)]
    depth: usize,

    #[arg(long, default_value_t = 1_000)]
    print_interval_ms: u64,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ServiceConfig> {
    let Some(path) = path else {
        return Ok(ServiceConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    let instrument = InstrumentId::parse(&args.symbol).context("invalid --symbol")?;

    tracing::info!(%instrument, "Starting book-sync service");

    let source = Arc::new(BinanceSnapshotSource::new(&config.binance)?);
    let connector = Arc::new(BinanceStreamConnector::new(&config.binance));
    let (handle, task) = spawn(config.sync.clone(), instrument, source, connector);

    let mut ticker = tokio::time::interval(Duration::from_millis(args.print_interval_ms.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let view = handle.current_view(args.depth);
                let bids: Vec<String> = view.bids.iter().map(|l| format!("{}@{}", l.quantity, l.price)).collect();
                let asks: Vec<String> = view.asks.iter().map(|l| format!("{}@{}", l.quantity, l.price)).collect();
                tracing::info!(
                    status = %handle.connection_status(),
                    sequence = ?view.baseline_sequence,
                    spread = ?view.spread(),
                    last_trade = ?handle.recent_trades().first().map(|t| t.price),
                    bids = %bids.join(" "),
                    asks = %asks.join(" "),
                    "Top of book"
                );
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for ctrl-c")?;
                break;
            }
        }
    }

    tracing::info!(metrics = ?handle.metrics(), "Shutting down");
    handle.shutdown().await?;
    task.await?;

    Ok(())
}
