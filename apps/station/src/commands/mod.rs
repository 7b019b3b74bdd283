//! # HTTP Commands Module
//!
//! Every route the station serves.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (router)
//! ├── product.rs  ◄─── Barcode lookup, manual save
//! ├── session.rs  ◄─── RFID login, logout, status, timeout
//! ├── shop.rs     ◄─── Shop list
//! ├── image.rs    ◄─── Photo serving, upload, QR code
//! └── pages.rs    ◄─── HTML pages, banner, health
//! ```
//!
//! ## Route Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GET  /                     banner                                      │
//! │  GET  /desktop              views/index.html                            │
//! │  GET  /desktop_input        views/desktop_eingabe.html                  │
//! │  GET  /mobile               mobile_views/mobile.html                    │
//! │  GET  /mobile/erfassung     mobile_views/erfassung.html                 │
//! │  GET  /public/*             static assets                               │
//! │  GET  /health               database + hub state                        │
//! │                                                                         │
//! │  GET  /api/lookup_ean       ?ean=&online=1                              │
//! │  POST /api/save_item        { ean, name, qty, shop_id, rfid_uid }       │
//! │  GET  /api/shops            { shops: [...] }                            │
//! │  POST /api/login            { rfid_uid }                                │
//! │  POST /api/logout                                                       │
//! │  GET  /api/current_user     polled by the pages                         │
//! │  POST /api/session_timeout  { minutes }                                 │
//! │                                                                         │
//! │  GET  /image/{ean}          stored JPEG or placeholder PNG              │
//! │  POST /upload_image/{ean}   multipart field "image"                     │
//! │  GET  /qr                   PNG of the mobile URL                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures answer `{ "ok": false, "code": ..., "message": ... }` via
//! [`ApiError`](crate::error::ApiError).

pub mod image;
pub mod pages;
pub mod product;
pub mod session;
pub mod shop;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the station router.
pub fn router(state: AppState) -> Router {
    let public = ServeDir::new(&state.config.paths.public);

    Router::new()
        .route("/", get(pages::index))
        .route("/desktop", get(pages::desktop))
        .route("/desktop_input", get(pages::desktop_input))
        .route("/mobile", get(pages::mobile))
        .route("/mobile/erfassung", get(pages::mobile_capture))
        .route("/health", get(pages::health))
        .route("/api/lookup_ean", get(product::lookup_ean))
        .route("/api/save_item", post(product::save_item))
        .route("/api/shops", get(shop::list_shops))
        .route("/api/login", post(session::login))
        .route("/api/logout", post(session::logout))
        .route("/api/current_user", get(session::current_user))
        .route("/api/session_timeout", post(session::set_timeout))
        .route("/image/{ean}", get(image::product_image))
        .route(
            "/upload_image/{ean}",
            post(image::upload_image).layer(DefaultBodyLimit::max(image::MAX_UPLOAD_BYTES)),
        )
        .route("/qr", get(image::mobile_qr))
        .nest_service("/public", public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::StationConfig;
    use tagger_db::{Database, DbConfig};
    use tagger_sync::HubHandle;

    async fn setup() -> (AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut config = StationConfig::default();
        config.paths.images = dir.path().join("images");
        config.paths.views = dir.path().join("views");
        config.paths.mobile_views = dir.path().join("mobile_views");
        config.paths.public = dir.path().join("public");
        config.paths.placeholder_image = dir.path().join("dummy.png");

        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = AppState::new(config, db, Vec::new(), HubHandle::new());
        (state, dir)
    }

    async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(state: &AppState, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = call(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(state: &AppState, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = call(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    /// Posts a body as-is, with an optional content type.
    async fn post_raw(state: &AppState, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        let (status, body) = call(state, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_banner() {
        let (state, _dir) = setup().await;
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let (status, body) = call(&state, request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("/mobile"));
    }

    #[tokio::test]
    async fn test_lookup_unknown_and_empty() {
        let (state, _dir) = setup().await;

        let (status, body) = get_json(&state, "/api/lookup_ean?ean=0000000000000").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["name"], "");
        assert_eq!(body["source"], "none");
        assert_eq!(body["message"], "Not found");

        let (status, body) = get_json(&state, "/api/lookup_ean?ean=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "none");
    }

    #[tokio::test]
    async fn test_save_requires_ean() {
        let (state, _dir) = setup().await;
        let (status, body) = post_json(&state, "/api/save_item", json!({ "ean": "  ", "name": "Tea" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "missing identifier");
    }

    #[tokio::test]
    async fn test_save_accepts_long_barcode() {
        let (state, _dir) = setup().await;
        let ean = "1".repeat(65);

        let (status, body) = post_json(&state, "/api/save_item", json!({ "ean": &ean, "name": "Tea" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ean"], ean.as_str());

        let stored = state.db.products().get(&ean).await.unwrap().unwrap();
        assert_eq!(stored.name, "Tea");
    }

    #[tokio::test]
    async fn test_save_with_malformed_body() {
        let (state, _dir) = setup().await;
        let (status, body) = post_raw(&state, "/api/save_item", Some("application/json"), "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_lookup() {
        let (state, _dir) = setup().await;
        let user = state.db.users().insert("Anna", "04A1B2").await.unwrap();

        let (status, body) = post_json(
            &state,
            "/api/save_item",
            json!({ "ean": " 4006381333931 ", "name": " Pencil ", "qty": "3", "rfid_uid": "04A1B2" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ean"], "4006381333931");
        assert_eq!(body["message"], "Saved");

        let (_, body) = get_json(&state, "/api/lookup_ean?ean=4006381333931").await;
        assert_eq!(body["name"], "Pencil");
        assert_eq!(body["qty"], 3.0);
        assert_eq!(body["source"], "manual");
        assert_eq!(body["message"], "");

        let stored = state.db.products().get("4006381333931").await.unwrap().unwrap();
        assert_eq!(stored.last_user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_save_with_non_numeric_qty() {
        let (state, _dir) = setup().await;
        let (status, _) = post_json(&state, "/api/save_item", json!({ "ean": "123", "qty": "lots" })).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = get_json(&state, "/api/lookup_ean?ean=123").await;
        assert_eq!(body["qty"], 0.0);
    }

    #[tokio::test]
    async fn test_shops() {
        let (state, _dir) = setup().await;
        state.db.shops().insert("ALDI", "Aldi Süd", None).await.unwrap();

        let (status, body) = get_json(&state, "/api/shops").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shops"].as_array().unwrap().len(), 1);
        assert_eq!(body["shops"][0]["code"], "ALDI");
    }

    #[tokio::test]
    async fn test_login_flow() {
        let (state, _dir) = setup().await;
        state.db.users().insert("Anna", "04A1B2").await.unwrap();

        let (_, body) = post_json(&state, "/api/login", json!({ "rfid_uid": "FFFF" })).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["is_rfid"], false);
        assert_eq!(body["message"], "RFID not recognized");

        let (_, body) = post_json(&state, "/api/login", json!({ "rfid_uid": "04A1B2" })).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["user_name"], "Anna");

        let (_, body) = get_json(&state, "/api/current_user").await;
        assert!(body["user_id"].is_i64());
        assert_eq!(body["user_name"], "Anna");

        let (_, body) = post_json(&state, "/api/logout", json!({})).await;
        assert_eq!(body["ok"], true);

        let (_, body) = get_json(&state, "/api/current_user").await;
        assert!(body["user_id"].is_null());
        assert_eq!(body["user_name"], "");
    }

    #[tokio::test]
    async fn test_session_timeout_coercion() {
        let (state, _dir) = setup().await;

        let (_, body) = post_json(&state, "/api/session_timeout", json!({ "minutes": "abc" })).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["timeout_minutes"], 0);

        let (_, body) = post_json(&state, "/api/session_timeout", json!({ "minutes": 9999 })).await;
        assert_eq!(body["timeout_minutes"], 480);
    }

    #[tokio::test]
    async fn test_session_timeout_unreadable_body_applies_zero() {
        let (state, _dir) = setup().await;
        state.session.set_timeout(30);

        let (status, body) = post_raw(&state, "/api/session_timeout", None, "minutes=abc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["timeout_minutes"], 0);
        assert_eq!(state.session.current_user().timeout_minutes, 0);
    }

    #[tokio::test]
    async fn test_login_with_empty_body() {
        let (state, _dir) = setup().await;
        let (status, body) = post_raw(&state, "/api/login", Some("application/json"), "").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["ok"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_image_falls_back_to_placeholder() {
        let (state, _dir) = setup().await;

        let request = Request::builder().uri("/image/123").body(Body::empty()).unwrap();
        let (status, _) = call(&state, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        std::fs::write(&state.config.paths.placeholder_image, b"placeholder").unwrap();
        let request = Request::builder().uri("/image/123").body(Body::empty()).unwrap();
        let response = router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_missing_page_is_404() {
        let (state, _dir) = setup().await;
        let (status, body) = get_json(&state, "/desktop").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_health_without_hub() {
        let (state, _dir) = setup().await;
        let (status, body) = get_json(&state, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], true);
        assert_eq!(body["hub"], "not_started");
        assert_eq!(body["ok"], false);
    }
}
