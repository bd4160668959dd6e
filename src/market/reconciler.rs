/// Live-quote reconciliation: map batch quote responses back onto contracts
use std::collections::HashMap;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::broker::kite::{FullQuote, KiteClient, LtpQuote};
use crate::error::Result;
use crate::types::{CategorizedContract, LiveQuote, QuoteMode};

/// Kite accepts up to 500 instrument identifiers per quote call.
pub const QUOTE_BATCH_SIZE: usize = 500;

/// Small pause between batches to stay inside the broker's rate limit.
const INTER_BATCH_DELAY: Duration = Duration::from_millis(100);

/// Quote-fetch capability the reconciler runs against. `KiteClient` is the
/// production implementation; tests substitute a canned source.
#[allow(async_fn_in_trait)]
pub trait QuoteSource {
    async fn quote(&self, identifiers: &[String]) -> Result<HashMap<String, FullQuote>>;
    async fn ltp(&self, identifiers: &[String]) -> Result<HashMap<String, LtpQuote>>;
}

impl QuoteSource for KiteClient {
    async fn quote(&self, identifiers: &[String]) -> Result<HashMap<String, FullQuote>> {
        KiteClient::quote(self, identifiers).await
    }

    async fn ltp(&self, identifiers: &[String]) -> Result<HashMap<String, LtpQuote>> {
        KiteClient::ltp(self, identifiers).await
    }
}

/// `EXCHANGE:SYMBOL` identifiers the quote endpoints expect.
fn quote_identifiers(contracts: &[CategorizedContract]) -> Vec<String> {
    contracts
        .iter()
        .map(|c| format!("{}:{}", c.exchange, c.symbol))
        .collect()
}

fn symbol_from_identifier(identifier: &str) -> &str {
    identifier.rsplit(':').next().unwrap_or(identifier)
}

fn find_by_symbol<'a>(
    contracts: &'a [CategorizedContract],
    symbol: &str,
) -> Option<&'a CategorizedContract> {
    contracts.iter().find(|c| c.symbol == symbol)
}

/// Change and change-percent against the previous close, both zero when
/// there is no usable previous close.
pub(crate) fn price_change(ltp: f64, prev_close: f64) -> (f64, f64) {
    if prev_close > 0.0 {
        let change = ltp - prev_close;
        (change, change / prev_close * 100.0)
    } else {
        (0.0, 0.0)
    }
}

fn full_quote_entry(symbol: &str, quote: &FullQuote) -> LiveQuote {
    let ohlc = quote.ohlc.clone().unwrap_or_default();
    let (change, change_percent) = price_change(quote.last_price, ohlc.close);

    let bid = quote
        .depth
        .as_ref()
        .and_then(|d| d.buy.first())
        .map(|level| level.price)
        .unwrap_or(0.0);
    let ask = quote
        .depth
        .as_ref()
        .and_then(|d| d.sell.first())
        .map(|level| level.price)
        .unwrap_or(0.0);

    LiveQuote {
        symbol: symbol.to_string(),
        ltp: quote.last_price,
        open: ohlc.open,
        high: ohlc.high,
        low: ohlc.low,
        close: ohlc.close,
        volume: quote.volume,
        change,
        change_percent,
        bid,
        ask,
        timestamp: Utc::now(),
    }
}

fn ltp_entry(symbol: &str, quote: &LtpQuote) -> LiveQuote {
    LiveQuote {
        symbol: symbol.to_string(),
        ltp: quote.last_price,
        open: 0.0,
        high: 0.0,
        low: 0.0,
        close: 0.0,
        volume: 0,
        change: 0.0,
        change_percent: 0.0,
        bid: 0.0,
        ask: 0.0,
        timestamp: Utc::now(),
    }
}

/// Fetch full quotes for the given contracts, keyed by instrument token.
///
/// Batch failures are logged and skipped; partial results are acceptable.
pub async fn fetch_full_quotes<Q: QuoteSource>(
    source: &Q,
    contracts: &[CategorizedContract],
) -> HashMap<u64, LiveQuote> {
    let identifiers = quote_identifiers(contracts);
    let mut live = HashMap::new();

    for batch in identifiers.chunks(QUOTE_BATCH_SIZE) {
        match source.quote(batch).await {
            Ok(quotes) => {
                for (identifier, quote) in &quotes {
                    let symbol = symbol_from_identifier(identifier);
                    if let Some(contract) = find_by_symbol(contracts, symbol) {
                        live.insert(contract.instrument_token, full_quote_entry(symbol, quote));
                    }
                }
            }
            Err(e) => warn!("Quote batch failed, skipping {} ids: {}", batch.len(), e),
        }
        sleep(INTER_BATCH_DELAY).await;
    }

    live
}

/// LTP-only variant for accounts without market-data entitlement. All
/// non-price fields stay zero.
pub async fn fetch_ltp_quotes<Q: QuoteSource>(
    source: &Q,
    contracts: &[CategorizedContract],
) -> HashMap<u64, LiveQuote> {
    let identifiers = quote_identifiers(contracts);
    let mut live = HashMap::new();

    for batch in identifiers.chunks(QUOTE_BATCH_SIZE) {
        match source.ltp(batch).await {
            Ok(quotes) => {
                for (identifier, quote) in &quotes {
                    let symbol = symbol_from_identifier(identifier);
                    if let Some(contract) = find_by_symbol(contracts, symbol) {
                        live.insert(contract.instrument_token, ltp_entry(symbol, quote));
                    }
                }
            }
            Err(e) => warn!("LTP batch failed, skipping {} ids: {}", batch.len(), e),
        }
        sleep(INTER_BATCH_DELAY).await;
    }

    live
}

/// Full quotes with a one-shot degradation to the LTP endpoint when the
/// full-quote pass yields nothing (e.g. no market-data entitlement).
pub async fn fetch_live_quotes<Q: QuoteSource>(
    source: &Q,
    contracts: &[CategorizedContract],
) -> (HashMap<u64, LiveQuote>, QuoteMode) {
    let full = fetch_full_quotes(source, contracts).await;
    if !full.is_empty() || contracts.is_empty() {
        return (full, QuoteMode::Full);
    }

    info!("Full quote access unavailable, falling back to LTP endpoint");
    let ltp = fetch_ltp_quotes(source, contracts).await;
    (ltp, QuoteMode::LtpOnly)
}
