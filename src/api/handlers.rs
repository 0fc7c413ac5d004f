//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use bytes::Bytes;

use crate::cache::{ExportedItem, TieredCache};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::responses::value_to_string;
use crate::models::{
    BulkWriteResponse, ClearResponse, DeleteResponse, ExistsResponse, ExportResponse,
    GetResponse, HealthResponse, ImportRequest, MgetRequest, MgetResponse, MsetRequest,
    SetRequest, SetResponse, StatsResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally (one lock per tier), so the state
/// only needs an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TieredCache>,
}

impl AppState {
    pub fn new(cache: TieredCache) -> Self {
        Self {
            cache: Arc::new(cache),
        }
    }

    /// Builds the cache described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(TieredCache::from_config(config)?))
    }
}

/// Handler for PUT /set
///
/// Stores a key-value pair with optional TTL and target tier.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    let tier = req.tier.unwrap_or(0);
    let ttl = req.ttl();
    state
        .cache
        .set_in_tier(&req.key, req.value, ttl, tier)
        .await?;

    Ok(Json(SetResponse::new(req.key, tier)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key).await? {
        Some(value) => Ok(Json(GetResponse::new(key, value_to_string(&value)))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if state.cache.delete(&key).await? {
        Ok(Json(DeleteResponse::new(key)))
    } else {
        Err(CacheError::NotFound(key))
    }
}

/// Handler for GET /exists/:key
pub async fn exists_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<ExistsResponse>> {
    let exists = state.cache.exists(&key).await?;
    Ok(Json(ExistsResponse { key, exists }))
}

/// Handler for POST /mget
pub async fn mget_handler(
    State(state): State<AppState>,
    Json(req): Json<MgetRequest>,
) -> Json<MgetResponse> {
    Json(MgetResponse::new(state.cache.mget(&req.keys).await))
}

/// Handler for POST /mset
pub async fn mset_handler(
    State(state): State<AppState>,
    Json(req): Json<MsetRequest>,
) -> Json<BulkWriteResponse> {
    let ttl = req.ttl();
    let report = state.cache.mset(req.entries, ttl).await;
    Json(report.into())
}

/// Handler for POST /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.clear().await;
    Json(ClearResponse { cleared })
}

/// Handler for GET /export
pub async fn export_handler(State(state): State<AppState>) -> Json<ExportResponse> {
    Json(ExportResponse::new(state.cache.export()))
}

/// Handler for POST /import
pub async fn import_handler(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> Json<BulkWriteResponse> {
    let items = req
        .items
        .into_iter()
        .map(|entry| ExportedItem {
            key: entry.key,
            value: Bytes::from(entry.value),
            ttl_remaining_ms: entry.ttl_remaining_ms,
        })
        .collect();

    Json(state.cache.import(items).await.into())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        snapshot: state.cache.get_statistics(),
        tier_count: state.cache.tier_count(),
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
