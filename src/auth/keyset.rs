//! JWKS cache for token verification.
//!
//! The keyset either comes from the configured signing key (static) or is
//! fetched from a remote endpoint. Remote keysets are cached in memory with
//! a TTL; an unknown `kid` triggers a refresh under a cooldown so a flood
//! of bad tokens cannot hammer the endpoint. If a refresh fails, the last
//! known keyset keeps serving so verification stays available.

use crate::auth::jwks::Jwks;
use anyhow::{anyhow, Context, Result};
use reqwest::{
    header::{ETAG, IF_NONE_MATCH},
    Client,
};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock;
use tracing::{error, info, info_span, warn, Instrument};
use url::Url;

// Mirrors the upstream key provider policy: keys are trusted for a day,
// but refresh attempts for unknown kids are spaced out.
const KEYSET_CACHE_TTL_SECONDS: u64 = 24 * 60 * 60;
const KEYSET_REFRESH_COOLDOWN_SECONDS: u64 = 6;

#[derive(Debug)]
enum KeysetSource {
    /// Keyset derived from local key material and never refreshed.
    Static,
    /// Keyset fetched from a JWKS endpoint and refreshed as needed.
    Remote { url: String, client: Client },
}

#[derive(Debug, Clone)]
struct KeysetCache {
    /// Last known keyset for token verification.
    jwks: Jwks,
    /// When the keyset was last successfully fetched.
    fetched_at: Instant,
    /// `ETag` from the last successful fetch, if the endpoint provided one.
    etag: Option<String>,
}

impl KeysetCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < Duration::from_secs(KEYSET_CACHE_TTL_SECONDS)
    }
}

/// Reported by `/health` for the token-verification dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyStatus {
    /// Remote endpoint is reachable and the JWKS fetch succeeded.
    Ok,
    /// Remote endpoint is unreachable or the JWKS fetch failed.
    Error,
    /// Static keyset means no external dependency.
    Static,
}

impl DependencyStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::Static => "static",
        }
    }
}

/// Concurrent-read JWKS holder with remote refresh.
#[derive(Debug)]
pub struct KeysetVerifier {
    keyset_source: KeysetSource,
    keyset_cache: RwLock<KeysetCache>,
    /// Timestamp used to throttle refresh attempts on unknown kid.
    last_refresh_unix: AtomicU64,
}

impl KeysetVerifier {
    /// Build from a static keyset, no remote refresh.
    #[must_use]
    pub fn new_static(jwks: Jwks) -> Self {
        Self {
            keyset_source: KeysetSource::Static,
            keyset_cache: RwLock::new(KeysetCache {
                jwks,
                fetched_at: Instant::now(),
                etag: None,
            }),
            last_refresh_unix: AtomicU64::new(0),
        }
    }

    /// Build a verifier that fetches the keyset from a remote URL.
    ///
    /// The first fetch happens lazily: the verifier starts with an empty,
    /// stale cache so verification fails closed until a refresh succeeds.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn new_remote(url: String) -> Result<Self> {
        let parsed = Url::parse(&url).context("Invalid JWKS URL")?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(anyhow!("JWKS URL must use http or https: {url}"));
        }

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build JWKS HTTP client")?;

        Ok(Self {
            keyset_source: KeysetSource::Remote { url, client },
            keyset_cache: RwLock::new(KeysetCache {
                jwks: Jwks { keys: Vec::new() },
                fetched_at: stale_instant(),
                etag: None,
            }),
            last_refresh_unix: AtomicU64::new(0),
        })
    }

    /// Return the remote JWKS URL when configured, otherwise `None`.
    #[must_use]
    pub fn keyset_url(&self) -> Option<&str> {
        match &self.keyset_source {
            KeysetSource::Static => None,
            KeysetSource::Remote { url, .. } => Some(url.as_str()),
        }
    }

    /// Return a keyset snapshot; refresh if stale, keep cache if refresh
    /// fails.
    pub async fn snapshot(&self) -> Jwks {
        let (cached, fresh) = {
            let cache = self.keyset_cache.read().await;
            (cache.jwks.clone(), cache.is_fresh())
        };

        if fresh {
            return cached;
        }

        if let KeysetSource::Remote { url, .. } = &self.keyset_source {
            if let Err(err) = self.refresh_keyset().await {
                // Refresh failure shouldn't break verification; keep using
                // the last cached keyset.
                warn!(
                    error = %err,
                    url = %url,
                    "failed to refresh jwks cache"
                );
                return cached;
            }
        }

        let cache = self.keyset_cache.read().await;
        cache.jwks.clone()
    }

    /// Fetch the JWKS and update the in-memory cache.
    async fn refresh_keyset(&self) -> Result<()> {
        let (url, client, etag) = match &self.keyset_source {
            KeysetSource::Static => return Ok(()),
            KeysetSource::Remote { url, client } => {
                let etag = self.keyset_cache.read().await.etag.clone();
                (url.clone(), client.clone(), etag)
            }
        };

        match fetch_keyset(&client, &url, etag.as_deref()).await? {
            FetchOutcome::NotModified => {
                let mut cache = self.keyset_cache.write().await;
                cache.fetched_at = Instant::now();
            }
            FetchOutcome::Updated { jwks, etag } => {
                if jwks.keys.is_empty() {
                    return Err(anyhow!("JWKS endpoint returned an empty key set"));
                }
                let mut cache = self.keyset_cache.write().await;
                cache.jwks = jwks;
                cache.fetched_at = Instant::now();
                cache.etag = etag;
                info!(keyset_keys = cache.jwks.keys.len(), "jwks cache refreshed");
            }
        }
        Ok(())
    }

    /// Report dependency status for `/health` by attempting a refresh.
    pub async fn dependency_status(&self) -> DependencyStatus {
        match &self.keyset_source {
            KeysetSource::Static => DependencyStatus::Static,
            KeysetSource::Remote { url, .. } => match self.refresh_keyset().await {
                Ok(()) => DependencyStatus::Ok,
                Err(err) => {
                    warn!(
                        error = %err,
                        url = %url,
                        "jwks fetch failed during health check"
                    );
                    DependencyStatus::Error
                }
            },
        }
    }

    /// Refresh if a token `kid` is unknown, with cooldown to avoid spamming
    /// the endpoint.
    pub async fn refresh_on_unknown_kid(&self) -> Result<bool> {
        if matches!(&self.keyset_source, KeysetSource::Static) {
            return Ok(false);
        }
        let now = now_unix_seconds_u64();
        let last = self.last_refresh_unix.load(Ordering::Relaxed);
        if now.saturating_sub(last) < KEYSET_REFRESH_COOLDOWN_SECONDS {
            return Ok(false);
        }
        self.last_refresh_unix.store(now, Ordering::Relaxed);
        self.refresh_keyset().await?;
        Ok(true)
    }
}

fn now_unix_seconds_u64() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Produce an Instant that is already stale to trigger an early refresh.
fn stale_instant() -> Instant {
    Instant::now()
        .checked_sub(Duration::from_secs(KEYSET_CACHE_TTL_SECONDS + 1))
        .unwrap_or_else(Instant::now)
}

enum FetchOutcome {
    NotModified,
    Updated { jwks: Jwks, etag: Option<String> },
}

/// Fetch the JWKS document and parse its JSON body.
async fn fetch_keyset(client: &Client, url: &str, etag: Option<&str>) -> Result<FetchOutcome> {
    let span = info_span!(
        "jwks.fetch",
        http.method = "GET",
        url = %url
    );
    async {
        let mut request = client.get(url);
        if let Some(etag_value) = etag {
            request = request.header(IF_NONE_MATCH, etag_value);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.as_u16() == 304 {
            return Ok(FetchOutcome::NotModified);
        }
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            error!("jwks fetch failed: {status}");
            return Err(anyhow!("jwks fetch failed: {status}"));
        }

        let jwks = Jwks::from_json(&body).context("Invalid JWKS JSON")?;
        Ok(FetchOutcome::Updated { jwks, etag })
    }
    .instrument(span)
    .await
}
