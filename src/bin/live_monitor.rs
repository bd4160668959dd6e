/// Continuous live dashboard with fixed-interval refresh
/// Usage: cargo run --bin live_monitor --release
///
/// Categorizes once, probes full-quote entitlement on a small sample,
/// then loops: fetch quotes for every contract, redraw, sleep. Stop with
/// Ctrl+C; there is no graceful cancellation beyond the interrupt.
use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kitefutures::broker::KiteClient;
use kitefutures::config::load_config;
use kitefutures::display::{clear_screen, render_live_dashboard};
use kitefutures::market::categorizer::categorize_futures;
use kitefutures::market::reconciler::{fetch_full_quotes, fetch_ltp_quotes};
use kitefutures::types::QuoteMode;

const PROBE_CONTRACTS: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Kite Near Future - live monitoring");

    let config = load_config("config.toml")?;
    if config.access_token.is_empty() {
        error!("No access token; run `convert_token` first");
        return Err("missing access token".into());
    }

    let client = KiteClient::new(&config.api_key, &config.access_token)?;
    client.test_connection().await?;

    info!("📥 Loading futures contracts...");
    let instruments = client.instruments(Some(&config.exchange)).await?;
    let outcome = categorize_futures(&instruments, Utc::now().date_naive());
    if outcome.contracts.is_empty() {
        error!("No futures contracts found");
        return Err("empty contract universe".into());
    }
    info!("✅ Loaded {} contracts", outcome.contracts.total());

    // Market-data entitlement probe: a handful of current-bucket contracts
    // is enough to tell full quotes apart from LTP-only access.
    let mut mode = QuoteMode::Full;
    let probe: Vec<_> = outcome.contracts.current.iter().take(PROBE_CONTRACTS).cloned().collect();
    if !probe.is_empty() {
        info!("🧪 Testing market data access...");
        if fetch_full_quotes(&client, &probe).await.is_empty() {
            warn!("Full quote access failed; using LTP endpoint");
            mode = QuoteMode::LtpOnly;
        } else {
            info!("✅ Full quote access available");
        }
    }

    let targets = outcome.contracts.all();
    info!(
        "🎯 Monitoring {} contracts, refresh every {}s",
        targets.len(),
        config.refresh_interval_secs
    );

    let mut refresh_count: u64 = 0;
    loop {
        refresh_count += 1;

        let live = match mode {
            QuoteMode::Full => fetch_full_quotes(&client, &targets).await,
            QuoteMode::LtpOnly => fetch_ltp_quotes(&client, &targets).await,
        };

        clear_screen();
        render_live_dashboard(
            &outcome.contracts,
            &live,
            refresh_count,
            config.refresh_interval_secs,
        );

        sleep(Duration::from_secs(config.refresh_interval_secs)).await;
    }
}
