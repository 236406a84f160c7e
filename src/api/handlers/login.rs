//! Session + token issuance endpoint.

use crate::api::error::AppError;
use crate::auth::{AuthState, SessionRecord};
use axum::{
    extract::Extension,
    http::header::SET_COOKIE,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginSessionForm {
    pub username: Option<String>,
}

#[utoipa::path(
    post,
    path= "/loginSession",
    responses (
        (status = 200, description = "Session created; body carries a signed token", body = String, content_type = "application/json"),
        (status = 500, description = "Signing failed"),
    ),
    tag= "login"
)]
#[instrument(skip(auth, payload))]
pub async fn login_session(
    auth: Extension<Arc<AuthState>>,
    payload: Option<Form<LoginSessionForm>>,
) -> Result<Response, AppError> {
    let username = payload
        .and_then(|Form(form)| form.username)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| "guest".to_string());

    let record = SessionRecord::for_user(&username);
    debug!(user = %record.user_id, role = record.role.as_str(), "creating session");

    let session_token = auth.sessions.create(record).await?;

    // Signing failures propagate; an unsigned token is never returned.
    let token = auth.tokens.issue(&username)?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, auth.sessions.cookie(&session_token)?);

    Ok((headers, Json(json!({ "token": token }))).into_response())
}
