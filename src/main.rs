/// REST facade server for categorized Kite futures data
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kitefutures::broker::KiteClient;
use kitefutures::config::load_config;
use kitefutures::server::{router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_config("config.toml")?;
    info!("🚀 Kite Near Future API starting");
    info!("   API key: configured");

    let client = if config.access_token.is_empty() {
        warn!("No access token configured; waiting for POST /api/config");
        None
    } else {
        Some(Arc::new(KiteClient::new(&config.api_key, &config.access_token)?))
    };

    let state = Arc::new(AppState::new(config.exchange.clone(), client));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("📡 Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
