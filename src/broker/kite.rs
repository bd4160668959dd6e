/// Zerodha Kite Connect REST client
use std::collections::HashMap;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{KiteError, Result};
use crate::types::Instrument;

const BASE_URL: &str = "https://api.kite.trade";
const KITE_VERSION: &str = "3";

/// Standard Kite response envelope: `{"status": ..., "data": ...}` on
/// success, `{"status": "error", "message": ..., "error_type": ...}` on
/// failure (the broker also returns the error envelope with non-2xx codes).
#[derive(Debug, Deserialize)]
pub(crate) struct KiteEnvelope<T> {
    status: String,
    data: Option<T>,
    message: Option<String>,
    error_type: Option<String>,
}

impl<T> KiteEnvelope<T> {
    pub(crate) fn into_data(self) -> Result<T> {
        if self.status != "success" {
            return Err(KiteError::Broker {
                error_type: self.error_type.unwrap_or_else(|| "UnknownError".to_string()),
                message: self.message.unwrap_or_else(|| "no message from broker".to_string()),
            });
        }
        self.data
            .ok_or_else(|| KiteError::MalformedResponse("missing data field".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ohlc {
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub close: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepthLevel {
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub orders: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Depth {
    #[serde(default)]
    pub buy: Vec<DepthLevel>,
    #[serde(default)]
    pub sell: Vec<DepthLevel>,
}

/// Full market quote from `/quote`. Requires market-data entitlement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FullQuote {
    #[serde(default)]
    pub last_price: f64,
    pub ohlc: Option<Ohlc>,
    #[serde(default)]
    pub volume: i64,
    pub depth: Option<Depth>,
    #[serde(default)]
    pub net_change: f64,
}

/// Minimal quote from `/quote/ltp`, available on basic subscriptions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LtpQuote {
    #[serde(default)]
    pub last_price: f64,
}

/// Order placement parameters for `/orders/regular`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderParams {
    pub variety: String,
    pub exchange: String,
    pub tradingsymbol: String,
    pub transaction_type: String,
    pub quantity: u32,
    pub product: String,
    pub order_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    pub validity: String,
}

#[derive(Debug, Deserialize)]
struct OrderResponseData {
    order_id: String,
}

/// Instrument master row as the broker serves it. Lot size and tick size
/// can be absent for index rows; defaults are applied in the conversion.
#[derive(Debug, Deserialize)]
struct RawInstrument {
    #[serde(default)]
    instrument_token: u64,
    #[serde(default)]
    tradingsymbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    expiry: String,
    #[serde(default)]
    strike: Option<f64>,
    #[serde(default)]
    tick_size: Option<f64>,
    #[serde(default)]
    lot_size: Option<u32>,
    #[serde(default)]
    instrument_type: String,
    #[serde(default)]
    segment: String,
    #[serde(default)]
    exchange: String,
}

impl From<RawInstrument> for Instrument {
    fn from(raw: RawInstrument) -> Self {
        Instrument {
            instrument_token: raw.instrument_token,
            tradingsymbol: raw.tradingsymbol,
            name: raw.name,
            expiry: raw.expiry,
            strike: raw.strike.unwrap_or(0.0),
            lot_size: raw.lot_size.unwrap_or(1),
            tick_size: raw.tick_size.unwrap_or(0.05),
            instrument_type: raw.instrument_type,
            segment: raw.segment,
            exchange: raw.exchange,
        }
    }
}

/// Decode the instrument master CSV body. Malformed rows are skipped.
pub(crate) fn parse_instrument_csv(body: &str) -> Vec<Instrument> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut instruments = Vec::new();
    let mut bad_rows = 0usize;
    for record in reader.deserialize::<RawInstrument>() {
        match record {
            Ok(raw) => instruments.push(raw.into()),
            Err(_) => bad_rows += 1,
        }
    }

    if bad_rows > 0 {
        warn!("Skipped {} malformed instrument rows", bad_rows);
    }
    instruments
}

/// Kite Connect API client
pub struct KiteClient {
    client: Client,
    api_key: String,
    access_token: String,
}

impl KiteClient {
    pub fn new(api_key: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(KiteClient {
            client,
            api_key: api_key.to_string(),
            access_token: access_token.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn auth_header(&self) -> String {
        format!("token {}:{}", self.api_key, self.access_token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .header("X-Kite-Version", KITE_VERSION)
            .header("Authorization", self.auth_header())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("GET {} -> {}", path, status);

        match serde_json::from_str::<KiteEnvelope<T>>(&body) {
            Ok(envelope) => envelope.into_data(),
            Err(_) if !status.is_success() => Err(KiteError::MalformedResponse(format!(
                "HTTP {} from {}",
                status, path
            ))),
            Err(e) => Err(KiteError::Json(e)),
        }
    }

    async fn post_form<T: DeserializeOwned, F: Serialize + ?Sized>(
        &self,
        path: &str,
        form: &F,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{}", BASE_URL, path))
            .header("X-Kite-Version", KITE_VERSION)
            .header("Authorization", self.auth_header())
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("POST {} -> {}", path, status);

        match serde_json::from_str::<KiteEnvelope<T>>(&body) {
            Ok(envelope) => envelope.into_data(),
            Err(_) if !status.is_success() => Err(KiteError::MalformedResponse(format!(
                "HTTP {} from {}",
                status, path
            ))),
            Err(e) => Err(KiteError::Json(e)),
        }
    }

    /// Download the instrument master, optionally scoped to one exchange.
    /// The broker serves this endpoint as CSV, not JSON.
    pub async fn instruments(&self, exchange: Option<&str>) -> Result<Vec<Instrument>> {
        let path = match exchange {
            Some(exchange) => format!("/instruments/{}", exchange),
            None => "/instruments".to_string(),
        };

        let response = self
            .client
            .get(format!("{}{}", BASE_URL, path))
            .header("X-Kite-Version", KITE_VERSION)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(KiteError::MalformedResponse(format!(
                "HTTP {} from {}",
                status, path
            )));
        }

        let instruments = parse_instrument_csv(&body);
        info!("Downloaded {} instruments from {}", instruments.len(), path);
        Ok(instruments)
    }

    /// Full quotes for up to 500 `EXCHANGE:SYMBOL` identifiers per call.
    pub async fn quote(&self, identifiers: &[String]) -> Result<HashMap<String, FullQuote>> {
        let query: Vec<(&str, &str)> = identifiers.iter().map(|id| ("i", id.as_str())).collect();
        self.get_json("/quote", &query).await
    }

    /// Last traded price only; works without full market-data entitlement.
    pub async fn ltp(&self, identifiers: &[String]) -> Result<HashMap<String, LtpQuote>> {
        let query: Vec<(&str, &str)> = identifiers.iter().map(|id| ("i", id.as_str())).collect();
        self.get_json("/quote/ltp", &query).await
    }

    pub async fn profile(&self) -> Result<Profile> {
        self.get_json("/user/profile", &[]).await
    }

    pub async fn margins(&self) -> Result<serde_json::Value> {
        self.get_json("/user/margins", &[]).await
    }

    pub async fn positions(&self) -> Result<serde_json::Value> {
        self.get_json("/portfolio/positions", &[]).await
    }

    pub async fn holdings(&self) -> Result<serde_json::Value> {
        self.get_json("/portfolio/holdings", &[]).await
    }

    pub async fn orders(&self) -> Result<serde_json::Value> {
        self.get_json("/orders", &[]).await
    }

    /// Historical OHLC candles for one instrument. Dates are
    /// `yyyy-mm-dd hh:mm:ss`; interval is `minute`, `day`, `5minute` etc.
    pub async fn historical_data(
        &self,
        instrument_token: u64,
        from_date: &str,
        to_date: &str,
        interval: &str,
    ) -> Result<serde_json::Value> {
        let path = format!("/instruments/historical/{}/{}", instrument_token, interval);
        self.get_json(&path, &[("from", from_date), ("to", to_date)]).await
    }

    /// Place a regular order; returns the broker's order id.
    pub async fn place_order(&self, params: &OrderParams) -> Result<String> {
        let data: OrderResponseData = self.post_form("/orders/regular", params).await?;
        info!("Order placed: {}", data.order_id);
        Ok(data.order_id)
    }

    /// Verify the session by fetching the user profile.
    pub async fn test_connection(&self) -> Result<Profile> {
        let profile = self.profile().await?;
        info!("✅ Connected to Kite as {} ({})", profile.user_name, profile.user_id);
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_HEADER: &str = "instrument_token,exchange_token,tradingsymbol,name,last_price,expiry,strike,tick_size,lot_size,instrument_type,segment,exchange";

    #[test]
    fn test_parse_instrument_csv() {
        let body = format!(
            "{}\n{}\n{}\n",
            CSV_HEADER,
            "12683010,49543,RELIANCE25SEPFUT,RELIANCE,0,2026-09-24,0,0.05,500,FUT,NFO-FUT,NFO",
            "13444354,52517,TCS25SEP3600CE,TCS,0,2026-09-24,3600,0.05,175,CE,NFO-OPT,NFO",
        );

        let instruments = parse_instrument_csv(&body);
        assert_eq!(instruments.len(), 2);

        let fut = &instruments[0];
        assert_eq!(fut.instrument_token, 12683010);
        assert_eq!(fut.tradingsymbol, "RELIANCE25SEPFUT");
        assert_eq!(fut.expiry, "2026-09-24");
        assert_eq!(fut.lot_size, 500);
        assert_eq!(fut.instrument_type, "FUT");
        assert_eq!(fut.exchange, "NFO");
    }

    #[test]
    fn test_parse_instrument_csv_defaults_missing_fields() {
        // Index rows leave lot size and tick size empty.
        let body = format!(
            "{}\n{}\n",
            CSV_HEADER, "256265,1001,NIFTY 50,NIFTY 50,0,,,,,EQ,INDICES,NSE",
        );

        let instruments = parse_instrument_csv(&body);
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].lot_size, 1);
        assert_eq!(instruments[0].tick_size, 0.05);
        assert_eq!(instruments[0].strike, 0.0);
        assert!(instruments[0].expiry.is_empty());
    }

    #[test]
    fn test_parse_instrument_csv_handles_quoted_commas() {
        let body = format!(
            "{}\n{}\n",
            CSV_HEADER,
            "101,1,ACME25SEPFUT,\"ACME, INC\",0,2026-09-24,0,0.05,100,FUT,NFO-FUT,NFO",
        );

        let instruments = parse_instrument_csv(&body);
        assert_eq!(instruments.len(), 1);
        assert_eq!(instruments[0].name, "ACME, INC");
    }

    #[test]
    fn test_envelope_success() {
        let envelope: KiteEnvelope<Profile> = serde_json::from_str(
            r#"{"status":"success","data":{"user_id":"AB1234","user_name":"Test User"}}"#,
        )
        .unwrap();

        let profile = envelope.into_data().unwrap();
        assert_eq!(profile.user_id, "AB1234");
        assert_eq!(profile.user_name, "Test User");
    }

    #[test]
    fn test_envelope_broker_error() {
        let envelope: KiteEnvelope<Profile> = serde_json::from_str(
            r#"{"status":"error","message":"Token is invalid or has expired.","error_type":"TokenException"}"#,
        )
        .unwrap();

        match envelope.into_data() {
            Err(KiteError::Broker { error_type, message }) => {
                assert_eq!(error_type, "TokenException");
                assert!(message.contains("expired"));
            }
            other => panic!("expected broker error, got {:?}", other),
        }
    }

    #[test]
    fn test_envelope_missing_data() {
        let envelope: KiteEnvelope<Profile> =
            serde_json::from_str(r#"{"status":"success"}"#).unwrap();

        assert!(matches!(
            envelope.into_data(),
            Err(KiteError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_envelope_historical_candles() {
        let envelope: KiteEnvelope<serde_json::Value> = serde_json::from_str(
            r#"{"status":"success","data":{"candles":[
                ["2026-08-28T09:15:00+0530",2460.0,2482.0,2455.0,2475.5,123456]
            ]}}"#,
        )
        .unwrap();

        let data = envelope.into_data().unwrap();
        let candle = &data["candles"][0];
        assert_eq!(candle[1], 2460.0);
        assert_eq!(candle[4], 2475.5);
        assert_eq!(candle[5], 123456);
    }

    #[test]
    fn test_full_quote_wire_shape() {
        let raw = r#"{
            "last_price": 2475.5,
            "volume": 123456,
            "net_change": 12.25,
            "ohlc": {"open": 2460.0, "high": 2482.0, "low": 2455.0, "close": 2463.25},
            "depth": {
                "buy": [{"price": 2475.0, "quantity": 500, "orders": 3}],
                "sell": [{"price": 2475.75, "quantity": 250, "orders": 2}]
            }
        }"#;

        let quote: FullQuote = serde_json::from_str(raw).unwrap();
        assert_eq!(quote.last_price, 2475.5);
        assert_eq!(quote.ohlc.as_ref().unwrap().close, 2463.25);
        assert_eq!(quote.depth.as_ref().unwrap().buy[0].price, 2475.0);
    }
}
