//! Server-side session store and cookie plumbing.
//!
//! Sessions are kept in an in-memory map keyed by an opaque random token.
//! The client only ever holds the token, carried in the `MY_SESSION`
//! cookie. Records are replaced wholesale, never partially updated, and
//! expire after a configurable TTL (checked on load, evicted lazily on
//! insert).

use crate::auth::principal::Role;
use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const SESSION_COOKIE_NAME: &str = "MY_SESSION";

/// Server-recognized login state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

impl SessionRecord {
    /// Build a record for `user_id`, deriving the role from it.
    #[must_use]
    pub fn for_user(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let role = Role::for_user(&user_id);
        Self {
            user_id,
            role,
            access_token: None,
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }
}

struct StoredSession {
    record: SessionRecord,
    created_at: Instant,
}

/// Keyed in-memory session store with per-key semantics.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, StoredSession>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Store a record under a fresh opaque token and return the token.
    ///
    /// # Errors
    /// Returns an error if the system RNG fails.
    pub async fn create(&self, record: SessionRecord) -> Result<String> {
        let token = generate_session_token()?;
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        sessions.insert(
            token.clone(),
            StoredSession {
                record,
                created_at: Instant::now(),
            },
        );
        Ok(token)
    }

    /// Look up a record by token. Expired entries are dropped on access.
    pub async fn load(&self, token: &str) -> Option<SessionRecord> {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry.record.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Drop a session, if present.
    pub async fn remove(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }

    /// Build the `Set-Cookie` value carrying a session token.
    ///
    /// # Errors
    /// Returns an error if the token produces an invalid header value.
    pub fn cookie(&self, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let max_age = self.ttl.as_secs();
        HeaderValue::from_str(&format!(
            "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
        ))
    }
}

/// Create a session token for the auth cookie. The raw value only goes to
/// the client; the store keys on it directly since it never leaves memory.
fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Pull the session token out of the `Cookie` header, if present.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn create_then_load_round_trip() {
        let store = store();
        let token = store
            .create(SessionRecord::for_user("admin"))
            .await
            .unwrap();
        let record = store.load(&token).await.unwrap();
        assert_eq!(record.user_id, "admin");
        assert_eq!(record.role, Role::Admin);

        let token = store
            .create(SessionRecord::for_user("guest"))
            .await
            .unwrap();
        let record = store.load(&token).await.unwrap();
        assert_eq!(record.role, Role::User);
    }

    #[tokio::test]
    async fn unknown_token_loads_nothing() {
        let store = store();
        assert!(store.load("missing").await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_dropped_on_load() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.create(SessionRecord::for_user("ddd")).await.unwrap();
        assert!(store.load(&token).await.is_none());
    }

    #[tokio::test]
    async fn remove_clears_the_record() {
        let store = store();
        let token = store.create(SessionRecord::for_user("ddd")).await.unwrap();
        store.remove(&token).await;
        assert!(store.load(&token).await.is_none());
    }

    #[tokio::test]
    async fn tokens_are_unique_and_opaque() {
        let store = store();
        let first = store.create(SessionRecord::for_user("a")).await.unwrap();
        let second = store.create(SessionRecord::for_user("a")).await.unwrap();
        assert_ne!(first, second);
        // 32 bytes of entropy, base64url without padding
        assert_eq!(first.len(), 43);
    }

    #[test]
    fn cookie_carries_expected_attributes() {
        let store = store();
        let cookie = store.cookie("tok").unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("MY_SESSION=tok;"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=60"));
    }

    #[test]
    fn session_token_extraction_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("other=1; MY_SESSION=abc123; theme=dark"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(extract_session_token(&headers), None);

        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn record_access_token_is_optional() {
        let record = SessionRecord::for_user("oauth-user").with_access_token("ya29.token");
        assert_eq!(record.access_token.as_deref(), Some("ya29.token"));
        let json = serde_json::to_string(&SessionRecord::for_user("x")).unwrap();
        assert!(!json.contains("access_token"));
    }
}
