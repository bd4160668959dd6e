/// One-shot near-future dashboard
/// Usage: cargo run --bin near_future --release
///
/// Fetches the NFO instrument master, buckets futures by expiry, pulls
/// live quotes (falling back to LTP-only when the account lacks market
/// data entitlement) and renders the result once.
use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kitefutures::broker::KiteClient;
use kitefutures::config::load_config;
use kitefutures::display::render_dashboard;
use kitefutures::market::categorizer::categorize_futures;
use kitefutures::market::reconciler::fetch_live_quotes;
use kitefutures::types::QuoteMode;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🔍 Kite Near Future Analysis");

    let config = load_config("config.toml")?;
    if config.access_token.is_empty() {
        error!("No access token; run `convert_token` first");
        return Err("missing access token".into());
    }

    let client = KiteClient::new(&config.api_key, &config.access_token)?;
    client.test_connection().await?;

    info!("📥 Fetching futures contracts from {}...", config.exchange);
    let instruments = client.instruments(Some(&config.exchange)).await?;
    info!("📊 Processing {} instruments...", instruments.len());

    let outcome = categorize_futures(&instruments, Utc::now().date_naive());
    if outcome.contracts.is_empty() {
        error!("No futures contracts found");
        return Err("empty contract universe".into());
    }

    info!(
        "✅ Found {} contracts (current {}, near {}, far {}); skipped {}",
        outcome.contracts.total(),
        outcome.contracts.current.len(),
        outcome.contracts.near.len(),
        outcome.contracts.far.len(),
        outcome.skipped.total()
    );

    info!("📊 Fetching live market data...");
    let targets = outcome.contracts.all();
    let (live, mode) = fetch_live_quotes(&client, &targets).await;
    if mode == QuoteMode::LtpOnly {
        warn!("Account lacks full market-data access; showing last price only");
    }

    render_dashboard(&outcome.contracts, &live);
    info!("🎯 Analysis complete: live data for {} contracts", live.len());

    Ok(())
}
