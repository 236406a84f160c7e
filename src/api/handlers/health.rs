//! Connection-pool health endpoint.
//!
//! Always answers 200: monitoring failures are reported inside the
//! `database` section rather than as an error status, so dashboards keep
//! getting a payload while the pool is down.

use crate::api::PoolInfo;
use crate::auth::AuthState;
use crate::GIT_COMMIT_HASH;
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};
use sqlx::Connection;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info_span, Instrument};

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Pool gauges, or an error field when the pool is unreachable", body = String, content_type = "application/json"),
    ),
    tag= "health"
)]
pub async fn health(
    db: Extension<PoolInfo>,
    auth: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let database = match probe(&db).await {
        Ok(gauges) => gauges,
        Err(err) => {
            error!("Failed to probe connection pool: {err:#}");
            json!({ "error": err.to_string() })
        }
    };

    let keyset_status = auth.tokens.keyset_status().await;
    debug!("Keyset dependency: {}", keyset_status.as_str());

    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0);

    let body = Json(json!({
        "database": database,
        "keyset": keyset_status.as_str(),
        "timestamp": timestamp,
        "status": "healthy",
    }));

    let short_hash = if GIT_COMMIT_HASH.len() > 7 {
        &GIT_COMMIT_HASH[0..7]
    } else {
        ""
    };

    let mut headers = HeaderMap::new();
    if let Ok(value) = format!(
        "{}:{}:{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
    .parse()
    {
        headers.insert("X-App", value);
    }

    (StatusCode::OK, headers, body)
}

/// Acquire and ping a connection, then report the pool gauges.
async fn probe(db: &PoolInfo) -> anyhow::Result<Value> {
    let acquire_span = info_span!("db.acquire", db.system = "mysql", db.operation = "ACQUIRE");
    let mut conn = db.acquire().instrument(acquire_span).await?;

    let ping_span = info_span!("db.ping", db.system = "mysql", db.operation = "PING");
    conn.ping().instrument(ping_span).await?;

    let total = db.pool.size();
    let idle = u32::try_from(db.pool.num_idle()).unwrap_or(u32::MAX);

    Ok(json!({
        "activeConnections": total.saturating_sub(idle),
        "idleConnections": idle,
        "totalConnections": total,
        "threadsAwaitingConnection": db.metrics.waiting(),
        "maxPoolSize": db.max_connections,
        "minIdle": db.min_connections,
    }))
}
