//! # Product Commands
//!
//! Barcode lookup and manual save.
//!
//! ## Lookup Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Barcode Lookup Flow                                  │
//! │                                                                         │
//! │  Scanner "types" 4006381333931 + Enter into the desktop page           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  GET /api/lookup_ean?ean=4006381333931&online=1                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LookupChain: local store ──► OpenGTINDB ──► Open Food Facts           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  { ok, ean, name, brand, image_path, qty, shop_id, source, message }   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Page sends set_article over the hub so phones follow                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;
use tagger_core::validation::{coerce_quantity, coerce_shop_id, normalize_barcode, normalize_name};
use tagger_core::{ProductChanges, ProductRecord};

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub ean: String,
    /// `1` allows remote providers.
    #[serde(default)]
    pub online: Option<String>,
}

/// Lookup result as the pages expect it.
#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub ok: bool,
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub image_path: Option<String>,
    pub qty: f64,
    pub shop_id: Option<i64>,
    /// Provenance tag: `local`, `manual`, a provider id, or `none`.
    pub source: String,
    pub message: String,
}

impl From<ProductRecord> for LookupResponse {
    fn from(record: ProductRecord) -> Self {
        let message = if record.is_placeholder() {
            "Not found".to_string()
        } else {
            String::new()
        };
        LookupResponse {
            ok: true,
            source: record.provenance.to_string(),
            ean: record.ean,
            name: record.name,
            brand: record.brand,
            image_path: record.image_path,
            qty: record.qty,
            shop_id: record.shop_id,
            message,
        }
    }
}

/// `GET /api/lookup_ean?ean=&online=1`
///
/// Never fails: faults inside the chain are logged and read as "not found".
pub async fn lookup_ean(State(state): State<AppState>, Query(query): Query<LookupQuery>) -> Json<LookupResponse> {
    let online = query.online.as_deref().map(str::trim) == Some("1");
    debug!(ean = %query.ean, online, "lookup_ean command");

    let record = state.lookup.lookup(&query.ean, online).await;
    Json(record.into())
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub ok: bool,
    pub ean: String,
    pub message: String,
}

/// `POST /api/save_item`
///
/// Body fields are read leniently: `qty` and `shop_id` may arrive as strings
/// from form inputs. The record is attributed to the owner of `rfid_uid` if
/// given and known, else to the logged-in user. A body that is not JSON is a
/// validation error.
pub async fn save_item(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SaveResponse>, ApiError> {
    let Json(body) = payload?;
    let text = |key: &str| match body.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };

    let ean = normalize_barcode(&text("ean"))?;
    let name = normalize_name(&text("name"));
    let qty = coerce_quantity(body.get("qty"))?;
    let shop_id = coerce_shop_id(body.get("shop_id"));

    let tag = text("rfid_uid");
    let tag_user = if tag.trim().is_empty() {
        None
    } else {
        state.db.users().find_by_tag(&tag).await?.map(|user| user.id)
    };
    let user_id = tag_user.or_else(|| state.session.peek_user_id());

    let changes = ProductChanges::manual(&ean, name)
        .with_qty(qty)
        .with_shop(shop_id)
        .with_user(user_id);
    let record = state.db.products().upsert(&changes).await?;

    info!(ean = %record.ean, name = %record.name, user_id = ?user_id, "Product saved");
    Ok(Json(SaveResponse {
        ok: true,
        ean: record.ean,
        message: "Saved".to_string(),
    }))
}
