/// Kite Connect session API: request-token → access-token exchange
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

use crate::broker::kite::KiteEnvelope;
use crate::error::{KiteError, Result};

const LOGIN_URL: &str = "https://kite.trade/connect/login";
const TOKEN_URL: &str = "https://api.kite.trade/session/token";

/// A long-lived API session obtained from a one-time request token.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
}

/// Login page that yields the request token after a browser sign-in.
pub fn login_url(api_key: &str) -> String {
    format!("{}?api_key={}&v=3", LOGIN_URL, api_key)
}

/// Keyed checksum the broker requires: hex SHA-256 of
/// `api_key ‖ request_token ‖ api_secret`, in that order.
pub fn checksum(api_key: &str, request_token: &str, api_secret: &str) -> String {
    let digest = Sha256::digest(format!("{}{}{}", api_key, request_token, api_secret).as_bytes());
    digest.iter().fold(String::with_capacity(64), |mut out, byte| {
        let _ = write!(out, "{:02x}", byte);
        out
    })
}

/// Exchange a request token for an access token.
///
/// Request tokens are single-use and expire within minutes; on a broker
/// rejection the caller must obtain a fresh one — there is no retry here.
pub async fn exchange_request_token(
    api_key: &str,
    api_secret: &str,
    request_token: &str,
) -> Result<Session> {
    let checksum = checksum(api_key, request_token, api_secret);

    let client = reqwest::Client::new();
    let response = client
        .post(TOKEN_URL)
        .header("X-Kite-Version", "3")
        .form(&[
            ("api_key", api_key),
            ("request_token", request_token),
            ("checksum", checksum.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    let session = match serde_json::from_str::<KiteEnvelope<Session>>(&body) {
        Ok(envelope) => envelope.into_data()?,
        Err(_) if !status.is_success() => {
            return Err(KiteError::MalformedResponse(format!(
                "HTTP {} from session/token",
                status
            )))
        }
        Err(e) => return Err(KiteError::Json(e)),
    };

    info!("🎫 Access token issued for user {}", session.user_id);
    Ok(session)
}

/// Persist a fresh access token by rewriting the `access_token = "…"` line
/// of the TOML config in place.
pub fn save_access_token<P: AsRef<Path>>(path: P, access_token: &str) -> Result<()> {
    let content = std::fs::read_to_string(&path)?;
    let updated = rewrite_access_token(&content, access_token);
    std::fs::write(&path, updated)?;
    info!("Access token saved to {}", path.as_ref().display());
    Ok(())
}

fn rewrite_access_token(content: &str, access_token: &str) -> String {
    let replacement = format!("access_token = \"{}\"", access_token);
    let mut replaced = false;

    let mut out: Vec<String> = content
        .lines()
        .map(|line| {
            if !replaced && line.trim_start().starts_with("access_token") && line.contains('=') {
                replaced = true;
                replacement.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        out.push(replacement);
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}
