//! # Shop Commands

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;
use tagger_core::Shop;

#[derive(Debug, Serialize)]
pub struct ShopsResponse {
    pub shops: Vec<Shop>,
}

/// `GET /api/shops`. An install without the shops table gets an empty list.
pub async fn list_shops(State(state): State<AppState>) -> Json<ShopsResponse> {
    Json(ShopsResponse {
        shops: state.db.shops().list().await,
    })
}
