//! # Page Routes
//!
//! The HTML pages are plain files on disk; the station only hands them out.

use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;
use tagger_sync::Lifecycle;

const BANNER: &str = "Server running. Desktop: /desktop, Mobile: /mobile";

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(BANNER)
}

/// `GET /desktop`
pub async fn desktop(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(state.config.paths.views.join("index.html")).await
}

/// `GET /desktop_input`
pub async fn desktop_input(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(state.config.paths.views.join("desktop_eingabe.html")).await
}

/// `GET /mobile`
pub async fn mobile(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(state.config.paths.mobile_views.join("mobile.html")).await
}

/// `GET /mobile/erfassung`
pub async fn mobile_capture(State(state): State<AppState>) -> Result<Response, ApiError> {
    serve_page(state.config.paths.mobile_views.join("erfassung.html")).await
}

async fn serve_page(path: PathBuf) -> Result<Response, ApiError> {
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => Ok(Html(body).into_response()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Page not available");
            Err(ApiError::not_found("Page", &page_name(&path)))
        }
    }
}

fn page_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub database: bool,
    pub hub: &'static str,
    pub peers: usize,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.health_check().await;
    let hub = match state.hub.lifecycle() {
        Lifecycle::NotStarted => "not_started",
        Lifecycle::Running => "running",
        Lifecycle::Stopped => "stopped",
    };
    let peers = state.hub.peer_count().await.unwrap_or(0);

    Json(HealthResponse {
        ok: database && state.hub.is_running(),
        database,
        hub,
        peers,
    })
}
