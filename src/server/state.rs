/// Shared application state for the REST facade
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::broker::kite::KiteClient;
use crate::error::{KiteError, Result};
use crate::market::categorizer::categorize_futures;
use crate::types::{CategorizedContracts, LiveQuote};

/// Process-wide state, injected into every handler.
///
/// Snapshots are immutable `Arc`s replaced wholesale under the lock;
/// concurrent refreshes race benignly (last writer wins, staleness only).
pub struct AppState {
    exchange: String,
    inner: RwLock<StateInner>,
}

struct StateInner {
    client: Option<Arc<KiteClient>>,
    contracts: Option<Arc<CategorizedContracts>>,
    live: Arc<HashMap<u64, LiveQuote>>,
    last_update: Option<DateTime<Utc>>,
}

impl AppState {
    pub fn new(exchange: String, client: Option<Arc<KiteClient>>) -> Self {
        AppState {
            exchange,
            inner: RwLock::new(StateInner {
                client,
                contracts: None,
                live: Arc::new(HashMap::new()),
                last_update: None,
            }),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Replace the broker client and drop every cached snapshot.
    pub async fn configure(&self, api_key: &str, access_token: &str) -> Result<()> {
        let client = Arc::new(KiteClient::new(api_key, access_token)?);

        let mut inner = self.inner.write().await;
        inner.client = Some(client);
        inner.contracts = None;
        inner.live = Arc::new(HashMap::new());
        inner.last_update = None;

        info!("Kite credentials updated");
        Ok(())
    }

    pub async fn client(&self) -> Result<Arc<KiteClient>> {
        self.inner
            .read()
            .await
            .client
            .clone()
            .ok_or(KiteError::Unconfigured)
    }

    /// Categorized contracts, fetched lazily on first access and reused
    /// until credentials change. Returns a fresh immutable snapshot.
    pub async fn contracts(&self) -> Result<Arc<CategorizedContracts>> {
        if let Some(cached) = self.inner.read().await.contracts.clone() {
            return Ok(cached);
        }

        let client = self.client().await?;
        let instruments = client.instruments(Some(&self.exchange)).await?;
        let outcome = categorize_futures(&instruments, Utc::now().date_naive());
        info!(
            "Categorized {} futures contracts ({} instruments skipped)",
            outcome.contracts.total(),
            outcome.skipped.total()
        );

        let snapshot = Arc::new(outcome.contracts);
        let mut inner = self.inner.write().await;
        inner.contracts = Some(Arc::clone(&snapshot));
        inner.last_update = Some(Utc::now());
        Ok(snapshot)
    }

    /// Contracts already in memory, without triggering a fetch.
    pub async fn cached_contracts(&self) -> Option<Arc<CategorizedContracts>> {
        self.inner.read().await.contracts.clone()
    }

    /// Swap in a fresh live-quote snapshot.
    pub async fn store_live(&self, live: HashMap<u64, LiveQuote>) -> Arc<HashMap<u64, LiveQuote>> {
        let snapshot = Arc::new(live);
        let mut inner = self.inner.write().await;
        inner.live = Arc::clone(&snapshot);
        inner.last_update = Some(Utc::now());
        snapshot
    }

    pub async fn live(&self) -> Arc<HashMap<u64, LiveQuote>> {
        Arc::clone(&self.inner.read().await.live)
    }

    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_update
    }
}
