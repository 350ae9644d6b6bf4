//! HTTP request handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::{session_id, OidcAuth};

pub const GREETING: &str = "hello, world!";

/// Shared application state
pub struct AppState {
    pub auth: Option<OidcAuth>,
}

impl AppState {
    pub fn new(auth: Option<OidcAuth>) -> Self {
        Self { auth }
    }
}

pub async fn greet() -> &'static str {
    GREETING
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn login(State(state): State<Arc<AppState>>) -> Response {
    let Some(auth) = &state.auth else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match auth.begin_login() {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::error!("Could not start login: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(auth) = &state.auth else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        tracing::warn!("Identity provider returned {}: {}", error, description);
        return (StatusCode::UNAUTHORIZED, format!("login failed: {}", error)).into_response();
    }

    let (Some(code), Some(login_state)) = (params.code, params.state) else {
        return (StatusCode::BAD_REQUEST, "missing code or state").into_response();
    };

    match auth.complete_login(&login_state, &code).await {
        Ok(session) => (
            [(header::SET_COOKIE, OidcAuth::session_cookie(&session))],
            Redirect::to("/greetings"),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            (StatusCode::UNAUTHORIZED, e.user_friendly_message()).into_response()
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let (Some(auth), Some(id)) = (&state.auth, session_id(&headers)) {
        auth.end_session(&id);
    }
    (
        [(header::SET_COOKIE, OidcAuth::cleared_cookie())],
        "logged out",
    )
        .into_response()
}
