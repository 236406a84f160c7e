//! OAuth redirect and callback endpoints.

use crate::api::error::AppError;
use crate::auth::{AuthState, SessionRecord};
use axum::{
    extract::{Extension, Query},
    http::header::SET_COOKIE,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// `GET /login` redirects to the provider's authorization endpoint.
pub async fn login(auth: Extension<Arc<AuthState>>) -> Result<Response, AppError> {
    let Some(bridge) = &auth.oauth else {
        return Ok((StatusCode::SERVICE_UNAVAILABLE, "OAuth is not configured").into_response());
    };

    let url = bridge.begin().await?;
    Ok(Redirect::to(&url).into_response())
}

/// `GET /callback` completes the flow and establishes a session.
///
/// Provider denial or missing parameters surface as explicit auth
/// failures; a partial session is never created.
pub async fn callback(
    auth: Extension<Arc<AuthState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let Some(bridge) = &auth.oauth else {
        return Ok((StatusCode::SERVICE_UNAVAILABLE, "OAuth is not configured").into_response());
    };

    if let Some(denial) = params.error {
        debug!(error = %denial, "authorization denied by provider");
        return Ok((StatusCode::FORBIDDEN, "Authorization was denied").into_response());
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        return Ok((StatusCode::UNAUTHORIZED, "Missing authorization response").into_response());
    };

    let (user, access_token) = match bridge.complete(&code, &state).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!("OAuth completion failed: {err}");
            return Ok((StatusCode::UNAUTHORIZED, "Authorization failed").into_response());
        }
    };

    let record = SessionRecord::for_user(&user.sub).with_access_token(access_token);
    debug!(user = %record.user_id, "oauth login completed");

    let session_token = auth.sessions.create(record).await?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, auth.sessions.cookie(&session_token)?);

    Ok((headers, Redirect::to("/hello")).into_response())
}
