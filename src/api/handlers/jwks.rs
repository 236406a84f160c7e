//! Published key set for token verification.

use crate::auth::AuthState;
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path= "/.well-known/jwks.json",
    responses (
        (status = 200, description = "JWKS public keys", body = String, content_type = "application/json"),
        (status = 404, description = "No key set published (symmetric profile)"),
    ),
    tag= "jwks"
)]
pub async fn jwks(auth: Extension<Arc<AuthState>>) -> impl IntoResponse {
    match auth.tokens.jwks_document() {
        Some(document) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json")],
            document.to_string(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
