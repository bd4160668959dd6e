/// REST facade over categorized contracts and live quotes
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::error::KiteError;
use crate::market::reconciler::fetch_live_quotes;
use crate::server::state::AppState;
use crate::types::{CategorizedContract, ExpiryBucket};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/config", post(update_config))
        .route("/api/contracts", get(contracts))
        .route("/api/live", get(live))
        .route("/api/contract/:symbol", get(contract_detail))
        .route("/api/stats", get(stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON error payload with the mapped HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError { status, message: message.into() }
    }
}

impl From<KiteError> for ApiError {
    fn from(err: KiteError) -> Self {
        let status = match &err {
            KiteError::Unconfigured => StatusCode::UNAUTHORIZED,
            KiteError::NotFound(_) => StatusCode::NOT_FOUND,
            KiteError::Http(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!("Request failed: {}", self.message);
        }
        let body = json!({ "status": "error", "detail": self.message });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    category: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ConfigUpdate {
    api_key: String,
    access_token: String,
}

fn parse_bucket(category: Option<&str>) -> Result<Option<ExpiryBucket>, ApiError> {
    match category {
        None => Ok(None),
        Some(raw) => ExpiryBucket::parse(raw)
            .map(Some)
            .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, format!("Invalid category: {}", raw))),
    }
}

fn truncated(bucket: &[CategorizedContract], limit: Option<usize>) -> &[CategorizedContract] {
    match limit {
        Some(n) if n < bucket.len() => &bucket[..n],
        _ => bucket,
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Kite Near Future API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "contracts": "/api/contracts",
            "live": "/api/live",
            "contract_detail": "/api/contract/{symbol}",
            "stats": "/api/stats"
        }
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    match health_payload(&state).await {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": err.to_string() })),
        )
            .into_response(),
    }
}

async fn health_payload(state: &AppState) -> crate::error::Result<Value> {
    let client = state.client().await?;
    let profile = client.profile().await?;

    let cached = state.cached_contracts().await.map(|c| c.total()).unwrap_or(0);
    Ok(json!({
        "status": "healthy",
        "kite_connected": true,
        "user": profile.user_name,
        "last_update": state.last_update().await,
        "cached_contracts": cached,
    }))
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<Json<Value>, ApiError> {
    state.configure(&update.api_key, &update.access_token).await?;
    Ok(Json(json!({ "status": "success", "message": "Configuration updated" })))
}

async fn contracts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let bucket = parse_bucket(query.category.as_deref())?;
    let snapshot = state.contracts().await?;

    let data = match bucket {
        Some(bucket) => json!(truncated(snapshot.bucket(bucket), query.limit)),
        None => json!({
            "current": truncated(&snapshot.current, query.limit),
            "near": truncated(&snapshot.near, query.limit),
            "far": truncated(&snapshot.far, query.limit),
        }),
    };

    Ok(Json(json!({
        "status": "success",
        "timestamp": Utc::now(),
        "data": data,
    })))
}

async fn live(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let bucket = parse_bucket(query.category.as_deref())?;
    let snapshot = state.contracts().await?;
    let client = state.client().await?;

    let mut targets: Vec<CategorizedContract> = match bucket {
        Some(bucket) => snapshot.bucket(bucket).to_vec(),
        None => snapshot.all(),
    };
    if let Some(limit) = query.limit {
        targets.truncate(limit);
    }

    let (quotes, mode) = fetch_live_quotes(client.as_ref(), &targets).await;
    let stored = state.store_live(quotes).await;

    Ok(Json(json!({
        "status": "success",
        "timestamp": Utc::now(),
        "count": stored.len(),
        "mode": mode.as_str(),
        "data": &*stored,
    })))
}

async fn contract_detail(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let symbol = symbol.to_uppercase();
    let snapshot = state.contracts().await?;

    let contract = snapshot
        .find_symbol(&symbol)
        .cloned()
        .ok_or_else(|| KiteError::NotFound(format!("Contract not found: {}", symbol)))?;

    let live = state.live().await.get(&contract.instrument_token).cloned();

    let mut data = serde_json::to_value(&contract).map_err(KiteError::from)?;
    if let Some(object) = data.as_object_mut() {
        object.insert(
            "live".to_string(),
            live.map(|q| json!(q)).unwrap_or_else(|| json!({})),
        );
    }

    Ok(Json(json!({ "status": "success", "data": data })))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    let contracts = state.cached_contracts().await;
    let (current, near, far) = contracts
        .as_ref()
        .map(|c| (c.current.len(), c.near.len(), c.far.len()))
        .unwrap_or((0, 0, 0));

    Json(json!({
        "status": "success",
        "timestamp": Utc::now(),
        "stats": {
            "total_contracts": {
                "current": current,
                "near": near,
                "far": far,
                "total": current + near + far,
            },
            "live_data_count": state.live().await.len(),
            "last_update": state.last_update().await,
        }
    }))
}
