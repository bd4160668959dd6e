/// Request-token to access-token converter
/// Usage: cargo run --bin convert_token -- <request_token> [--save]
///
/// The request token comes from the redirect URL after a browser login
/// (https://yourapp.com/?request_token=...&action=login&status=success).
/// With --save the fresh access token is written back into config.toml.
use anyhow::{bail, Context};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kitefutures::broker::session::{exchange_request_token, login_url, save_access_token};
use kitefutures::config::load_config;

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let request_token = args.iter().find(|a| !a.starts_with("--")).cloned();
    let save = args.iter().any(|a| a == "--save");

    let config = load_config(CONFIG_PATH)?;

    let Some(request_token) = request_token else {
        error!("Usage: convert_token <request_token> [--save]");
        info!("🌐 Obtain a request token by logging in at:");
        info!("   {}", login_url(&config.api_key));
        bail!("missing request token");
    };

    if config.api_secret.is_empty() {
        bail!("api_secret is empty in {}; token exchange needs it", CONFIG_PATH);
    }

    info!("🔐 Exchanging request token for access token...");
    let session = exchange_request_token(&config.api_key, &config.api_secret, &request_token)
        .await
        // Request tokens are single-use; a rejection means the caller must
        // log in again for a fresh one.
        .context("token exchange failed")?;

    info!("✅ Access token generated");
    info!("   User: {} ({})", session.user_name, session.user_id);
    info!("   Token: {}", session.access_token);

    if save {
        save_access_token(CONFIG_PATH, &session.access_token)?;
    } else {
        info!("💡 Re-run with --save to write it into {}", CONFIG_PATH);
    }

    Ok(())
}
