//! Token issuance and verification facade over the codec and keyset.
//!
//! Two profiles exist, selected at startup: RS256 with a local private key
//! and a JWKS (static or remote), or HS256 with a shared secret. Issuance
//! errors propagate; verification failures resolve to "no claims" so the
//! gateway can answer with its fixed 401.

use crate::auth::jwks::Jwks;
use crate::auth::jwt::{self, TokenClaims, VerifyOptions, LEEWAY_SECONDS};
use crate::auth::keyset::{DependencyStatus, KeysetVerifier};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, warn};

enum SigningMode {
    Rs256 {
        private_key: Vec<u8>,
        verifier: KeysetVerifier,
        jwks_document: String,
    },
    Hs256 {
        secret: SecretString,
    },
}

pub struct TokenService {
    issuer: String,
    audience: String,
    realm: String,
    kid: String,
    ttl_seconds: i64,
    mode: SigningMode,
}

/// Claim values shared by both profiles.
#[derive(Clone)]
pub struct TokenPolicy {
    pub issuer: String,
    pub audience: String,
    pub realm: String,
    pub kid: String,
    pub ttl_seconds: i64,
}

impl TokenService {
    /// Build the asymmetric profile from PEM/DER private key bytes.
    ///
    /// The key material is validated here; a malformed key fails startup
    /// rather than producing unsigned tokens later. `jwks_document` is the
    /// JSON published at `/.well-known/jwks.json`; when absent it is
    /// derived from the private key. `remote_jwks_url` switches
    /// verification to a remotely-fetched keyset.
    ///
    /// # Errors
    /// Returns an error on malformed key material, an invalid provided
    /// JWKS document, or an invalid remote URL.
    pub fn rs256(
        policy: TokenPolicy,
        private_key: Vec<u8>,
        jwks_document: Option<String>,
        remote_jwks_url: Option<String>,
    ) -> Result<Self> {
        let derived = Jwks::from_rsa_private_key_pem_or_der(&private_key, policy.kid.clone())
            .context("Invalid JWT private key")?;

        let jwks_document = match jwks_document {
            Some(doc) => {
                Jwks::from_json(&doc).context("Invalid JWKS document")?;
                doc
            }
            None => derived
                .to_json_pretty()
                .context("Failed to render JWKS document")?,
        };

        let verifier = match remote_jwks_url {
            Some(url) => KeysetVerifier::new_remote(url)?,
            None => KeysetVerifier::new_static(derived),
        };

        Ok(Self {
            issuer: policy.issuer,
            audience: policy.audience,
            realm: policy.realm,
            kid: policy.kid,
            ttl_seconds: policy.ttl_seconds,
            mode: SigningMode::Rs256 {
                private_key,
                verifier,
                jwks_document,
            },
        })
    }

    /// Build the symmetric profile from a shared secret.
    #[must_use]
    pub fn hs256(policy: TokenPolicy, secret: SecretString) -> Self {
        Self {
            issuer: policy.issuer,
            audience: policy.audience,
            realm: policy.realm,
            kid: policy.kid,
            ttl_seconds: policy.ttl_seconds,
            mode: SigningMode::Hs256 { secret },
        }
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// The JWKS JSON to publish, when the profile has one.
    #[must_use]
    pub fn jwks_document(&self) -> Option<&str> {
        match &self.mode {
            SigningMode::Rs256 { jwks_document, .. } => Some(jwks_document),
            SigningMode::Hs256 { .. } => None,
        }
    }

    /// Keyset dependency status for `/health`.
    pub async fn keyset_status(&self) -> DependencyStatus {
        match &self.mode {
            SigningMode::Rs256 { verifier, .. } => verifier.dependency_status().await,
            SigningMode::Hs256 { .. } => DependencyStatus::Static,
        }
    }

    /// Mint a signed token carrying `username`, expiring after the
    /// configured TTL.
    ///
    /// # Errors
    /// Propagates signing failures; a token is never silently issued
    /// unsigned.
    pub fn issue(&self, username: &str) -> Result<String, jwt::Error> {
        let now = jwt::now_unix_seconds();
        let claims = TokenClaims {
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        match &self.mode {
            SigningMode::Rs256 { private_key, .. } => {
                jwt::sign_rs256(private_key, self.kid.clone(), &claims)
            }
            SigningMode::Hs256 { secret } => {
                jwt::sign_hs256(secret.expose_secret().as_bytes(), &claims)
            }
        }
    }

    /// Verify a bearer token and return its claims if valid.
    ///
    /// Never errors past this boundary: any failure resolves to `None`.
    /// On an unknown `kid` the remote keyset is refreshed (under its
    /// cooldown) and verification retried once.
    pub async fn verify(&self, token: &str) -> Option<TokenClaims> {
        let options = VerifyOptions {
            expected_issuer: &self.issuer,
            expected_audience: &self.audience,
            now_unix_seconds: jwt::now_unix_seconds(),
            leeway_seconds: LEEWAY_SECONDS,
        };

        match &self.mode {
            SigningMode::Hs256 { secret } => {
                match jwt::verify_hs256(token, secret.expose_secret().as_bytes(), &options) {
                    Ok(claims) => Some(claims),
                    Err(e) => {
                        error!("Token verification failed: {e}");
                        None
                    }
                }
            }
            SigningMode::Rs256 { verifier, .. } => {
                let jwks = verifier.snapshot().await;
                match jwt::verify_rs256(token, &jwks, &options) {
                    Ok(claims) => Some(claims),
                    Err(jwt::Error::UnknownKid(kid)) => {
                        match verifier.refresh_on_unknown_kid().await {
                            Ok(true) => {
                                let jwks = verifier.snapshot().await;
                                match jwt::verify_rs256(token, &jwks, &options) {
                                    Ok(claims) => Some(claims),
                                    Err(e) => {
                                        error!("Token verification failed after refresh: {e}");
                                        None
                                    }
                                }
                            }
                            Ok(false) => {
                                warn!(kid = %kid, "Token kid not found and refresh suppressed");
                                None
                            }
                            Err(e) => {
                                error!("Keyset refresh failed: {e}");
                                None
                            }
                        }
                    }
                    Err(e) => {
                        error!("Token verification failed: {e}");
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_keys::TEST_RSA_PEM;

    fn policy() -> TokenPolicy {
        TokenPolicy {
            issuer: "http://localhost:8080/".to_string(),
            audience: "http://localhost:8080/hello".to_string(),
            realm: "Access to protected routes".to_string(),
            kid: "test-kid".to_string(),
            ttl_seconds: 60,
        }
    }

    fn rs256_service() -> TokenService {
        TokenService::rs256(policy(), TEST_RSA_PEM.as_bytes().to_vec(), None, None).unwrap()
    }

    #[tokio::test]
    async fn rs256_issue_then_verify() {
        let service = rs256_service();
        let token = service.issue("admin").unwrap();
        let claims = service.verify(&token).await.unwrap();
        assert_eq!(claims.username, "admin");
        assert_eq!(claims.aud, "http://localhost:8080/hello");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[tokio::test]
    async fn hs256_issue_then_verify() {
        let service = TokenService::hs256(policy(), SecretString::from("secret".to_string()));
        let token = service.issue("guest").unwrap();
        let claims = service.verify(&token).await.unwrap();
        assert_eq!(claims.username, "guest");
        assert!(service.jwks_document().is_none());
    }

    #[tokio::test]
    async fn verification_failures_resolve_to_none() {
        let service = rs256_service();
        assert!(service.verify("not-a-token").await.is_none());

        let other = TokenService::hs256(policy(), SecretString::from("secret".to_string()));
        let foreign = other.issue("guest").unwrap();
        assert!(service.verify(&foreign).await.is_none());
    }

    #[tokio::test]
    async fn keyset_status_is_static_without_remote_url() {
        let service = rs256_service();
        assert_eq!(service.keyset_status().await, DependencyStatus::Static);
    }

    #[test]
    fn rs256_rejects_malformed_key_at_startup() {
        let result = TokenService::rs256(policy(), b"garbage".to_vec(), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn jwks_document_defaults_to_derived_key() {
        let service = rs256_service();
        let doc = service.jwks_document().unwrap();
        let jwks = Jwks::from_json(doc).unwrap();
        assert!(jwks.find_by_kid("test-kid").is_some());
    }

    #[test]
    fn provided_jwks_document_must_parse() {
        let result = TokenService::rs256(
            policy(),
            TEST_RSA_PEM.as_bytes().to_vec(),
            Some("{not json".to_string()),
            None,
        );
        assert!(result.is_err());
    }
}
