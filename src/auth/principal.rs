//! Authenticated principal and role types.
//!
//! A principal is created per request by the gateway when a scheme
//! succeeds, attached for the lifetime of the request, and never
//! persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Schemes the gateway knows how to run. Each protected route declares
/// exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemeName {
    Basic,
    Form,
    Jwt,
    Session,
}

impl SchemeName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Form => "form",
            Self::Jwt => "jwt",
            Self::Session => "session",
        }
    }
}

impl fmt::Display for SchemeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role attached to a session, derived from the user id at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ADMIN")]
    Admin,
    #[serde(rename = "USER")]
    User,
}

impl Role {
    /// `admin` is the only user id that maps to [`Role::Admin`].
    #[must_use]
    pub fn for_user(user_id: &str) -> Self {
        if user_id == "admin" {
            Self::Admin
        } else {
            Self::User
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::User => "USER",
        }
    }
}

/// Authenticated identity produced by a scheme validator.
#[derive(Debug, Clone)]
pub struct Principal {
    pub subject: String,
    pub scheme: SchemeName,
    pub claims: HashMap<String, String>,
}

impl Principal {
    #[must_use]
    pub fn new(subject: impl Into<String>, scheme: SchemeName) -> Self {
        Self {
            subject: subject.into(),
            scheme,
            claims: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }
}
