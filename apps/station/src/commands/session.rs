//! # Session Commands
//!
//! Login by RFID tag, logout, status polling and the timeout setting.
//!
//! The pages poll `GET /api/current_user` every few seconds; that poll is
//! what notices an expired session.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;
use tagger_core::validation::coerce_timeout_minutes;
use tagger_core::SessionStatus;
use tagger_sync::LoginOutcome;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "tag")]
    pub rfid_uid: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub is_rfid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct TimeoutResponse {
    pub ok: bool,
    pub timeout_minutes: u32,
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;
    let response = match state.session.login_by_tag(&request.rfid_uid).await? {
        LoginOutcome::LoggedIn(user) => LoginResponse {
            ok: true,
            is_rfid: true,
            message: format!("Logged in as {}", user.name),
            user_id: Some(user.id),
            user_name: Some(user.name),
        },
        LoginOutcome::NotRecognized => LoginResponse {
            ok: false,
            is_rfid: false,
            user_id: None,
            user_name: None,
            message: "RFID not recognized".to_string(),
        },
    };
    Ok(Json(response))
}

/// `POST /api/logout`
pub async fn logout(State(state): State<AppState>) -> Json<OkResponse> {
    state.session.logout();
    Json(OkResponse { ok: true })
}

/// `GET /api/current_user`
pub async fn current_user(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session.current_user())
}

/// `POST /api/session_timeout` with `{ "minutes": ... }`.
///
/// Anything non-numeric applies 0 (never expire), and so does a body that is
/// not JSON at all.
pub async fn set_timeout(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Json<TimeoutResponse> {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection.body_text(), "session_timeout body unreadable");
            Value::Null
        }
    };
    let requested = body.get("minutes").unwrap_or(&Value::Null);
    let minutes = coerce_timeout_minutes(requested);
    debug!(requested = %requested, minutes, "set_timeout command");

    let applied = state.session.set_timeout(minutes as i64);
    Json(TimeoutResponse {
        ok: true,
        timeout_minutes: applied,
    })
}
