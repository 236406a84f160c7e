//! OAuth bridge: redirect to the provider's authorization endpoint, then
//! exchange the callback code for tokens and resolve the user through the
//! provider's user-info endpoint.
//!
//! Completion always goes through user info; the session is built from the
//! provider's `sub`, never by parsing the access token itself.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Pending authorization states are short-lived.
const STATE_TTL_SECONDS: u64 = 10 * 60;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("invalid oauth configuration: {0}")]
    Config(String),
    #[error("unknown or expired state parameter")]
    State,
    #[error("token exchange failed: {0}")]
    Exchange(String),
    #[error("user info request failed: {0}")]
    UserInfo(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth client settings. Defaults target Google's OIDC endpoints.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    #[must_use]
    pub fn google(
        client_id: impl Into<String>,
        client_secret: SecretString,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_url: redirect_url.into(),
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            scopes: vec![
                "openid".to_string(),
                "email".to_string(),
                "profile".to_string(),
            ],
        }
    }

    fn validate(&self) -> Result<(), OAuthError> {
        if self.client_id.is_empty() {
            return Err(OAuthError::Config("client_id cannot be empty".to_string()));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(OAuthError::Config(
                "client_secret cannot be empty".to_string(),
            ));
        }
        url::Url::parse(&self.redirect_url)
            .map_err(|e| OAuthError::Config(format!("invalid redirect_url: {e}")))?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Identity returned by the provider's user-info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Two-step OAuth state machine shared across requests.
pub struct OAuthBridge {
    config: OAuthConfig,
    http: reqwest::Client,
    pending: Mutex<HashMap<String, Instant>>,
    state_ttl: Duration,
}

impl OAuthBridge {
    /// # Errors
    /// Returns an error if the configuration is incomplete or the HTTP
    /// client cannot be built.
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            config,
            http,
            pending: Mutex::new(HashMap::new()),
            state_ttl: Duration::from_secs(STATE_TTL_SECONDS),
        })
    }

    /// Start the flow: register a fresh `state` and build the provider
    /// authorization URL to redirect to.
    ///
    /// # Errors
    /// Returns an error if the RNG fails or the auth URL is malformed.
    pub async fn begin(&self) -> Result<String, OAuthError> {
        let state = generate_state()?;
        {
            let mut pending = self.pending.lock().await;
            pending.retain(|_, created| created.elapsed() < self.state_ttl);
            pending.insert(state.clone(), Instant::now());
        }
        self.authorization_url(&state)
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = url::Url::parse(&self.config.auth_url)
            .map_err(|e| OAuthError::Config(format!("invalid auth URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Consume a pending `state`; unknown or expired values fail the flow.
    async fn take_state(&self, state: &str) -> bool {
        let mut pending = self.pending.lock().await;
        match pending.remove(state) {
            Some(created) => created.elapsed() < self.state_ttl,
            None => false,
        }
    }

    /// Finish the flow: validate `state`, exchange the code, and resolve
    /// the user through the user-info endpoint.
    ///
    /// # Errors
    /// Returns an error on unknown state, a failed exchange, or a failed
    /// user-info request. No partial session data is ever returned.
    pub async fn complete(&self, code: &str, state: &str) -> Result<(UserInfo, String), OAuthError> {
        if !self.take_state(state).await {
            return Err(OAuthError::State);
        }

        let tokens = self.exchange_code(code).await?;
        let user = self.fetch_user_info(&tokens.access_token).await?;
        Ok((user, tokens.access_token))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, OAuthError> {
        let request = TokenRequest {
            code,
            client_id: &self.config.client_id,
            client_secret: self.config.client_secret.expose_secret(),
            redirect_uri: &self.config.redirect_url,
            grant_type: "authorization_code",
        };

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Exchange(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, OAuthError> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::UserInfo(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

fn generate_state() -> Result<String, OAuthError> {
    let mut bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| OAuthError::Config(format!("rng failure: {e}")))?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OAuthConfig {
        OAuthConfig::google(
            "client-id",
            SecretString::from("client-secret".to_string()),
            "http://localhost:8080/callback",
        )
    }

    #[test]
    fn config_rejects_missing_fields() {
        let mut bad = config();
        bad.client_id = String::new();
        assert!(matches!(bad.validate(), Err(OAuthError::Config(_))));

        let mut bad = config();
        bad.redirect_url = "not-a-url".to_string();
        assert!(matches!(bad.validate(), Err(OAuthError::Config(_))));

        assert!(config().validate().is_ok());
    }

    #[tokio::test]
    async fn begin_produces_authorization_url_with_state() {
        let bridge = OAuthBridge::new(config()).unwrap();
        let url = bridge.begin().await.unwrap();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(url.contains("scope=openid+email+profile"));
        assert!(url.contains("state="));
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let bridge = OAuthBridge::new(config()).unwrap();
        let url = bridge.begin().await.unwrap();
        let state = url::Url::parse(&url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();

        assert!(bridge.take_state(&state).await);
        assert!(!bridge.take_state(&state).await);
    }

    #[tokio::test]
    async fn unknown_state_fails_completion() {
        let bridge = OAuthBridge::new(config()).unwrap();
        let result = bridge.complete("some-code", "bogus-state").await;
        assert!(matches!(result, Err(OAuthError::State)));
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let mut bridge = OAuthBridge::new(config()).unwrap();
        bridge.state_ttl = Duration::ZERO;
        let url = bridge.begin().await.unwrap();
        let state = url::Url::parse(&url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.to_string())
            .unwrap();
        assert!(!bridge.take_state(&state).await);
    }
}
