//! Router assembly and server bootstrap.

use crate::auth::AuthState;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, post},
    Extension, Router,
};
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    pool::PoolConnection,
    MySql,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub(crate) mod error;
pub mod handlers;

/// Gauge for callers currently awaiting a pool connection. sqlx exposes
/// pool size and idle count but not a waiter count, so acquisitions made
/// through [`PoolInfo::acquire`] are tracked here.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    waiting: AtomicUsize,
}

impl PoolMetrics {
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }
}

/// Connection pool plus the settings `/health` reports about it.
#[derive(Clone)]
pub struct PoolInfo {
    pub pool: MySqlPool,
    pub metrics: Arc<PoolMetrics>,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl PoolInfo {
    /// Acquire a connection while counting the wait in [`PoolMetrics`].
    ///
    /// # Errors
    /// Propagates pool acquisition failures.
    pub async fn acquire(&self) -> sqlx::Result<PoolConnection<MySql>> {
        self.metrics.waiting.fetch_add(1, Ordering::Relaxed);
        let result = self.pool.acquire().await;
        self.metrics.waiting.fetch_sub(1, Ordering::Relaxed);
        result
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::login::login_session,
        handlers::jwks::jwks,
        handlers::users::create,
        handlers::users::read,
        handlers::users::update,
        handlers::users::remove,
    ),
    components(schemas(handlers::users::User)),
    tags(
        (name = "kteeth", description = "Demo backend API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Assemble the application router around shared state.
#[must_use]
pub fn router(auth: Arc<AuthState>, db: PoolInfo) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route("/", get(handlers::root::root))
        .route("/hello", get(handlers::root::hello))
        .route("/loginSession", post(handlers::login::login_session))
        .route("/protected/route/basic", get(handlers::protected::basic))
        .route("/protected/route/form", get(handlers::protected::form))
        .route("/protected/route/jwt", get(handlers::protected::jwt))
        .route(
            "/protected/route/session",
            get(handlers::protected::session),
        )
        .route("/login", get(handlers::oauth::login))
        .route("/callback", get(handlers::oauth::callback))
        .route("/.well-known/jwks.json", get(handlers::jwks::jwks))
        .route("/health", get(handlers::health::health))
        .route("/users", post(handlers::users::create))
        .route(
            "/users/:id",
            get(handlers::users::read)
                .put(handlers::users::update)
                .delete(handlers::users::remove),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(auth))
                .layer(Extension(db)),
        )
}

/// Connect the pool and serve until shutdown.
///
/// # Errors
/// Returns an error if the listener cannot bind or the server fails.
pub async fn new(
    port: u16,
    dsn: String,
    max_connections: u32,
    min_connections: u32,
    auth: Arc<AuthState>,
) -> Result<()> {
    // Lazy connect keeps startup (and /health) available when the database
    // is down; the gauges report the error instead.
    let pool = MySqlPoolOptions::new()
        .min_connections(min_connections)
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .test_before_acquire(true)
        .connect_lazy(&dsn)
        .context("Invalid database connection string")?;

    let db = PoolInfo {
        pool,
        metrics: Arc::new(PoolMetrics::default()),
        max_connections,
        min_connections,
    };

    let app = router(auth, db);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
