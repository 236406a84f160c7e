//! Authentication gateway and supporting schemes.
//!
//! The gateway holds an immutable registry mapping scheme names to their
//! validator + challenge. Each protected route runs exactly one scheme:
//! success yields a [`Principal`], failure yields that scheme's challenge
//! response. Schemes are registered once at startup; there is no global
//! mutable configuration.

pub mod credentials;
pub mod jwks;
pub mod jwt;
pub mod keyset;
pub mod oauth;
pub mod principal;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod test_keys;

pub use credentials::StaticCredentials;
pub use oauth::OAuthBridge;
pub use principal::{Principal, Role, SchemeName};
pub use session::{SessionRecord, SessionStore};
pub use token::TokenService;

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Inputs a scheme may need. Headers are always present; form fields only
/// on the form scheme's routes.
#[derive(Clone, Copy)]
pub struct SchemeInput<'a> {
    pub headers: &'a HeaderMap,
    pub form_user: Option<&'a str>,
    pub form_password: Option<&'a str>,
}

impl<'a> SchemeInput<'a> {
    #[must_use]
    pub fn headers(headers: &'a HeaderMap) -> Self {
        Self {
            headers,
            form_user: None,
            form_password: None,
        }
    }

    #[must_use]
    pub fn form(
        headers: &'a HeaderMap,
        user: Option<&'a str>,
        password: Option<&'a str>,
    ) -> Self {
        Self {
            headers,
            form_user: user,
            form_password: password,
        }
    }
}

/// A registered scheme: validator plus challenge.
enum Scheme {
    Basic {
        credentials: StaticCredentials,
        realm: String,
    },
    Form {
        credentials: StaticCredentials,
    },
    Jwt {
        tokens: Arc<TokenService>,
    },
    Session {
        store: Arc<SessionStore>,
    },
}

impl Scheme {
    async fn validate(&self, input: &SchemeInput<'_>) -> Option<Principal> {
        match self {
            Self::Basic { credentials, .. } => {
                let (user, password) = credentials::basic_credentials(input.headers)?;
                if credentials.validate(&user, &password) {
                    Some(Principal::new(user, SchemeName::Basic))
                } else {
                    None
                }
            }
            Self::Form { credentials } => {
                let user = input.form_user.unwrap_or_default();
                let password = input.form_password.unwrap_or_default();
                if credentials.validate(user, password) {
                    Some(Principal::new(user, SchemeName::Form))
                } else {
                    None
                }
            }
            Self::Jwt { tokens } => {
                let token = credentials::bearer_token(input.headers)?;
                let claims = tokens.verify(&token).await?;
                Some(
                    Principal::new(claims.username.clone(), SchemeName::Jwt)
                        .with_claim("username", claims.username)
                        .with_claim("iss", claims.iss)
                        .with_claim("aud", claims.aud),
                )
            }
            Self::Session { store } => {
                let token = session::extract_session_token(input.headers)?;
                let record = store.load(&token).await?;
                Some(
                    Principal::new(record.user_id, SchemeName::Session)
                        .with_claim("role", record.role.as_str()),
                )
            }
        }
    }

    fn challenge(&self) -> Response {
        match self {
            Self::Basic { realm, .. } => {
                let mut headers = HeaderMap::new();
                if let Ok(value) = format!(r#"Basic realm="{realm}""#).parse() {
                    headers.insert(WWW_AUTHENTICATE, value);
                }
                (StatusCode::UNAUTHORIZED, headers).into_response()
            }
            Self::Form { .. } => StatusCode::UNAUTHORIZED.into_response(),
            Self::Jwt { .. } => {
                (StatusCode::UNAUTHORIZED, "Token is not valid or has expired").into_response()
            }
            Self::Session { .. } => {
                (StatusCode::UNAUTHORIZED, "Please login first.").into_response()
            }
        }
    }
}

/// Immutable scheme registry consulted by protected routes.
pub struct Gateway {
    schemes: HashMap<SchemeName, Scheme>,
}

impl Gateway {
    /// Run the route-declared scheme against the request. Success binds a
    /// principal, failure produces the scheme's challenge. An unregistered
    /// scheme is a plain 401: nothing can validate it, so nothing more
    /// specific can be said.
    pub async fn authenticate(
        &self,
        name: SchemeName,
        input: SchemeInput<'_>,
    ) -> Result<Principal, Response> {
        let Some(scheme) = self.schemes.get(&name) else {
            return Err(StatusCode::UNAUTHORIZED.into_response());
        };
        match scheme.validate(&input).await {
            Some(principal) => Ok(principal),
            None => Err(scheme.challenge()),
        }
    }
}

/// Aggregated authentication state shared with handlers.
pub struct AuthState {
    pub sessions: Arc<SessionStore>,
    pub tokens: Arc<TokenService>,
    pub oauth: Option<OAuthBridge>,
    pub gateway: Gateway,
}

impl AuthState {
    /// Register the standard schemes over the given stores and services.
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        tokens: Arc<TokenService>,
        oauth: Option<OAuthBridge>,
        credentials: StaticCredentials,
    ) -> Self {
        let mut schemes = HashMap::new();
        schemes.insert(
            SchemeName::Basic,
            Scheme::Basic {
                credentials: credentials.clone(),
                realm: tokens.realm().to_string(),
            },
        );
        schemes.insert(SchemeName::Form, Scheme::Form { credentials });
        schemes.insert(
            SchemeName::Jwt,
            Scheme::Jwt {
                tokens: tokens.clone(),
            },
        );
        schemes.insert(
            SchemeName::Session,
            Scheme::Session {
                store: sessions.clone(),
            },
        );

        Self {
            sessions,
            tokens,
            oauth,
            gateway: Gateway { schemes },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys::TEST_RSA_PEM;
    use axum::http::{header::AUTHORIZATION, header::COOKIE, HeaderValue};
    use secrecy::SecretString;
    use std::time::Duration;
    use super::token::TokenPolicy;

    fn state() -> AuthState {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let tokens = Arc::new(
            TokenService::rs256(
                TokenPolicy {
                    issuer: "http://localhost:8080/".to_string(),
                    audience: "http://localhost:8080/hello".to_string(),
                    realm: "Access to protected routes".to_string(),
                    kid: "k1".to_string(),
                    ttl_seconds: 60,
                },
                TEST_RSA_PEM.as_bytes().to_vec(),
                None,
                None,
            )
            .unwrap(),
        );
        AuthState::new(
            sessions,
            tokens,
            None,
            StaticCredentials::new("ddd", SecretString::from("ddd".to_string())),
        )
    }

    #[tokio::test]
    async fn basic_scheme_accepts_configured_pair() {
        let state = state();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic ZGRkOmRkZA=="));

        let principal = state
            .gateway
            .authenticate(SchemeName::Basic, SchemeInput::headers(&headers))
            .await
            .unwrap();
        assert_eq!(principal.subject, "ddd");
        assert_eq!(principal.scheme, SchemeName::Basic);
    }

    #[tokio::test]
    async fn basic_challenge_carries_www_authenticate() {
        let state = state();
        let headers = HeaderMap::new();
        let challenge = state
            .gateway
            .authenticate(SchemeName::Basic, SchemeInput::headers(&headers))
            .await
            .unwrap_err();
        assert_eq!(challenge.status(), StatusCode::UNAUTHORIZED);
        let value = challenge
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(value, r#"Basic realm="Access to protected routes""#);
    }

    #[tokio::test]
    async fn form_scheme_validates_fields() {
        let state = state();
        let headers = HeaderMap::new();

        let principal = state
            .gateway
            .authenticate(
                SchemeName::Form,
                SchemeInput::form(&headers, Some("ddd"), Some("ddd")),
            )
            .await
            .unwrap();
        assert_eq!(principal.subject, "ddd");

        let challenge = state
            .gateway
            .authenticate(
                SchemeName::Form,
                SchemeInput::form(&headers, Some("ddd"), None),
            )
            .await
            .unwrap_err();
        assert_eq!(challenge.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn jwt_scheme_round_trip_and_challenge() {
        let state = state();
        let token = state.tokens.issue("admin").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let principal = state
            .gateway
            .authenticate(SchemeName::Jwt, SchemeInput::headers(&headers))
            .await
            .unwrap();
        assert_eq!(principal.subject, "admin");
        assert_eq!(
            principal.claims.get("username").map(String::as_str),
            Some("admin")
        );

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer bogus"));
        let challenge = state
            .gateway
            .authenticate(SchemeName::Jwt, SchemeInput::headers(&headers))
            .await
            .unwrap_err();
        assert_eq!(challenge.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn session_scheme_reads_cookie() {
        let state = state();
        let token = state
            .sessions
            .create(SessionRecord::for_user("admin"))
            .await
            .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("MY_SESSION={token}")).unwrap(),
        );
        let principal = state
            .gateway
            .authenticate(SchemeName::Session, SchemeInput::headers(&headers))
            .await
            .unwrap();
        assert_eq!(principal.subject, "admin");
        assert_eq!(principal.claims.get("role").map(String::as_str), Some("ADMIN"));

        let no_cookie = HeaderMap::new();
        let challenge = state
            .gateway
            .authenticate(SchemeName::Session, SchemeInput::headers(&no_cookie))
            .await
            .unwrap_err();
        assert_eq!(challenge.status(), StatusCode::UNAUTHORIZED);
    }
}
