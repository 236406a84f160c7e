//! Static credential validation shared by the basic and form schemes.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64ct::{Base64, Encoding};
use secrecy::{ExposeSecret, SecretString};

/// A single username/password pair sourced from configuration.
#[derive(Clone)]
pub struct StaticCredentials {
    user: String,
    password: SecretString,
}

impl StaticCredentials {
    #[must_use]
    pub fn new(user: impl Into<String>, password: SecretString) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    /// Exact-match check. Empty usernames or passwords never match, so a
    /// missing field is a normal rejection rather than an error.
    #[must_use]
    pub fn validate(&self, user: &str, password: &str) -> bool {
        if user.is_empty() || password.is_empty() {
            return false;
        }
        user == self.user && password == self.password.expose_secret()
    }

    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Decode an `Authorization: Basic` header into `(user, password)`.
///
/// Returns `None` for a missing header, wrong scheme, invalid base64, or a
/// payload without a `:` separator.
#[must_use]
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.trim().strip_prefix("Basic ")?.trim();
    let decoded = Base64::decode_vec(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Extract a bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn creds() -> StaticCredentials {
        StaticCredentials::new("ddd", SecretString::from("ddd".to_string()))
    }

    #[test]
    fn matching_pair_is_accepted() {
        assert!(creds().validate("ddd", "ddd"));
    }

    #[test]
    fn wrong_password_is_rejected() {
        assert!(!creds().validate("ddd", "abc"));
        assert!(!creds().validate("abc", "ddd"));
    }

    #[test]
    fn empty_fields_are_rejected_not_errors() {
        assert!(!creds().validate("", ""));
        assert!(!creds().validate("ddd", ""));
        assert!(!creds().validate("", "ddd"));
    }

    #[test]
    fn basic_header_round_trip() {
        let mut headers = HeaderMap::new();
        // "ddd:ddd"
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic ZGRkOmRkZA=="));
        assert_eq!(
            basic_credentials(&headers),
            Some(("ddd".to_string(), "ddd".to_string()))
        );
    }

    #[test]
    fn basic_header_rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert_eq!(basic_credentials(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(basic_credentials(&headers), None);

        let empty = HeaderMap::new();
        assert_eq!(basic_credentials(&empty), None);
    }

    #[test]
    fn basic_header_requires_separator() {
        let mut headers = HeaderMap::new();
        // "dddddd" without a colon
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic ZGRkZGRk"));
        assert_eq!(basic_credentials(&headers), None);
    }

    #[test]
    fn bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic ZGRkOmRkZA=="));
        assert_eq!(bearer_token(&headers), None);
    }
}
