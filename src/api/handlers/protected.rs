//! Routes guarded by the authentication gateway. Each one declares a
//! single scheme and greets the principal the scheme produced.

use crate::auth::{AuthState, SchemeInput, SchemeName};
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct FormCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

pub async fn basic(auth: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    match auth
        .gateway
        .authenticate(SchemeName::Basic, SchemeInput::headers(&headers))
        .await
    {
        Ok(principal) => format!("Hello {}", principal.subject).into_response(),
        Err(challenge) => challenge,
    }
}

pub async fn form(
    auth: Extension<Arc<AuthState>>,
    headers: HeaderMap,
    payload: Option<Form<FormCredentials>>,
) -> Response {
    let credentials = payload.map(|Form(form)| form);
    let (user, password) = match &credentials {
        Some(form) => (form.user.as_deref(), form.password.as_deref()),
        None => (None, None),
    };

    match auth
        .gateway
        .authenticate(SchemeName::Form, SchemeInput::form(&headers, user, password))
        .await
    {
        Ok(principal) => format!("Hello {}", principal.subject).into_response(),
        Err(challenge) => challenge,
    }
}

pub async fn jwt(auth: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    match auth
        .gateway
        .authenticate(SchemeName::Jwt, SchemeInput::headers(&headers))
        .await
    {
        Ok(principal) => format!("Hello {}", principal.subject).into_response(),
        Err(challenge) => challenge,
    }
}

pub async fn session(auth: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    match auth
        .gateway
        .authenticate(SchemeName::Session, SchemeInput::headers(&headers))
        .await
    {
        Ok(principal) => format!("Hello {}", principal.subject).into_response(),
        Err(challenge) => challenge,
    }
}
