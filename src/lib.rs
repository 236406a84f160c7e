//! # Kteeth
//!
//! `kteeth` is a demonstration HTTP backend: an axum router wired with
//! session, JWT, basic, form and OAuth authentication on top of a MySQL
//! connection pool.
//!
//! ## Authentication
//!
//! Each protected route declares exactly one scheme. The gateway
//! ([`auth::Gateway`]) runs that scheme's validator and either attaches a
//! [`auth::Principal`] to the request or answers with the scheme's
//! challenge (a `WWW-Authenticate` header for basic auth, a fixed message
//! for tokens and sessions).
//!
//! Bearer tokens are RS256-signed JWTs verified against a JWKS that is
//! either derived from the configured private key or fetched from a remote
//! endpoint with an in-memory cache. A symmetric HS256 profile backed by a
//! shared secret is available for test deployments.
//!
//! ## Sessions
//!
//! `POST /loginSession` and the OAuth callback create a server-side session
//! record addressed by an opaque cookie (`MY_SESSION`). Records carry the
//! user id and a role derived from it at creation time, and expire after a
//! configurable TTL.

pub mod api;
pub mod auth;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
