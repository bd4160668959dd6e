/// Core type definitions for the Kite futures utility
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw instrument record from the broker's instrument master.
///
/// Numeric defaulting (lot size 1, tick size 0.05) happens once at CSV
/// ingestion in `broker::kite`; by the time an `Instrument` exists its
/// fields are already validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_token: u64,
    pub tradingsymbol: String,
    pub name: String,
    pub expiry: String,
    pub strike: f64,
    pub lot_size: u32,
    pub tick_size: f64,
    pub instrument_type: String,
    pub segment: String,
    pub exchange: String,
}

/// Expiry bucket for a futures contract, assigned by days to expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryBucket {
    Current,
    Near,
    Far,
}

impl ExpiryBucket {
    pub const ALL: [ExpiryBucket; 3] = [ExpiryBucket::Current, ExpiryBucket::Near, ExpiryBucket::Far];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryBucket::Current => "current",
            ExpiryBucket::Near => "near",
            ExpiryBucket::Far => "far",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Some(ExpiryBucket::Current),
            "near" => Some(ExpiryBucket::Near),
            "far" => Some(ExpiryBucket::Far),
            _ => None,
        }
    }
}

/// A futures contract assigned to an expiry bucket.
///
/// Derived wholesale on each categorization pass; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedContract {
    pub symbol: String,
    pub name: String,
    pub instrument_token: u64,
    pub expiry: String,
    pub expiry_formatted: String,
    pub days_to_expiry: i64,
    pub lot_size: u32,
    pub tick_size: f64,
    pub category: ExpiryBucket,
    pub exchange: String,
}

/// The three expiry buckets, each sorted by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedContracts {
    pub current: Vec<CategorizedContract>,
    pub near: Vec<CategorizedContract>,
    pub far: Vec<CategorizedContract>,
}

impl CategorizedContracts {
    pub fn bucket(&self, bucket: ExpiryBucket) -> &[CategorizedContract] {
        match bucket {
            ExpiryBucket::Current => &self.current,
            ExpiryBucket::Near => &self.near,
            ExpiryBucket::Far => &self.far,
        }
    }

    pub(crate) fn bucket_mut(&mut self, bucket: ExpiryBucket) -> &mut Vec<CategorizedContract> {
        match bucket {
            ExpiryBucket::Current => &mut self.current,
            ExpiryBucket::Near => &mut self.near,
            ExpiryBucket::Far => &mut self.far,
        }
    }

    pub fn total(&self) -> usize {
        self.current.len() + self.near.len() + self.far.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// All contracts in bucket order (current, near, far).
    pub fn all(&self) -> Vec<CategorizedContract> {
        let mut all = Vec::with_capacity(self.total());
        all.extend_from_slice(&self.current);
        all.extend_from_slice(&self.near);
        all.extend_from_slice(&self.far);
        all
    }

    pub fn find_symbol(&self, symbol: &str) -> Option<&CategorizedContract> {
        ExpiryBucket::ALL
            .iter()
            .flat_map(|b| self.bucket(*b).iter())
            .find(|c| c.symbol == symbol)
    }
}

/// Ephemeral per-token quote snapshot. Overwritten on every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub symbol: String,
    pub ltp: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub change: f64,
    pub change_percent: f64,
    pub bid: f64,
    pub ask: f64,
    pub timestamp: DateTime<Utc>,
}

/// Which quote capability produced a live-data pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteMode {
    /// Full quote with OHLC, volume and order-book depth.
    Full,
    /// Last-traded-price only; every other field is zero.
    LtpOnly,
}

impl QuoteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteMode::Full => "full",
            QuoteMode::LtpOnly => "ltp",
        }
    }
}

/// Per-reason counts of instruments the categorizer dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub not_future: usize,
    pub missing_expiry: usize,
    pub missing_token: usize,
    pub unparsable_expiry: usize,
    pub expired: usize,
    pub beyond_window: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.not_future
            + self.missing_expiry
            + self.missing_token
            + self.unparsable_expiry
            + self.expired
            + self.beyond_window
    }
}

/// Result of one categorization pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorizeOutcome {
    pub contracts: CategorizedContracts,
    pub skipped: SkipCounts,
}

/// Process configuration, loaded from `config.toml` with env overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_key: String::new(),
            api_secret: String::new(),
            access_token: String::new(),
            exchange: default_exchange(),
            port: default_port(),
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

fn default_exchange() -> String {
    "NFO".to_string()
}

fn default_port() -> u16 {
    7860
}

fn default_refresh_interval() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(symbol: &str, token: u64, bucket: ExpiryBucket) -> CategorizedContract {
        CategorizedContract {
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            instrument_token: token,
            expiry: "2026-09-24".to_string(),
            expiry_formatted: "24/09/2026".to_string(),
            days_to_expiry: 20,
            lot_size: 500,
            tick_size: 0.05,
            category: bucket,
            exchange: "NFO".to_string(),
        }
    }

    #[test]
    fn test_bucket_parse() {
        assert_eq!(ExpiryBucket::parse("current"), Some(ExpiryBucket::Current));
        assert_eq!(ExpiryBucket::parse("NEAR"), Some(ExpiryBucket::Near));
        assert_eq!(ExpiryBucket::parse("Far"), Some(ExpiryBucket::Far));
        assert_eq!(ExpiryBucket::parse("weekly"), None);
        assert_eq!(ExpiryBucket::parse(""), None);
    }

    #[test]
    fn test_find_symbol_across_buckets() {
        let mut contracts = CategorizedContracts::default();
        contracts.current.push(contract("RELIANCE25SEPFUT", 1, ExpiryBucket::Current));
        contracts.far.push(contract("RELIANCE25NOVFUT", 3, ExpiryBucket::Far));

        assert_eq!(
            contracts.find_symbol("RELIANCE25NOVFUT").map(|c| c.instrument_token),
            Some(3)
        );
        assert!(contracts.find_symbol("TCS25SEPFUT").is_none());
    }

    #[test]
    fn test_all_preserves_bucket_order() {
        let mut contracts = CategorizedContracts::default();
        contracts.near.push(contract("B", 2, ExpiryBucket::Near));
        contracts.current.push(contract("A", 1, ExpiryBucket::Current));
        contracts.far.push(contract("C", 3, ExpiryBucket::Far));

        let symbols: Vec<_> = contracts.all().into_iter().map(|c| c.symbol).collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
        assert_eq!(contracts.total(), 3);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.exchange, "NFO");
        assert_eq!(config.port, 7860);
        assert_eq!(config.refresh_interval_secs, 5);
        assert!(config.api_key.is_empty());
    }
}
