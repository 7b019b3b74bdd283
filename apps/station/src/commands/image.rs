//! # Image Commands
//!
//! Product photos in and out, plus the QR code that brings a phone to the
//! mobile page.
//!
//! Phones upload over HTTP (`POST /upload_image/{ean}`) and then send
//! `image_uploaded` on the hub so the other pages reload the picture.

use std::io::Cursor;
use std::path::Path;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::ApiError;
use crate::state::AppState;
use tagger_core::validation::normalize_barcode;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Multipart field carrying the photo.
const IMAGE_FIELD: &str = "image";

/// `GET /image/{ean}`
///
/// The stored JPEG if there is one, otherwise the placeholder PNG.
pub async fn product_image(
    State(state): State<AppState>,
    UrlPath(ean): UrlPath<String>,
) -> Result<Response, ApiError> {
    let ean = ean.trim();

    let stored = match state.db.products().image_path(ean).await {
        Ok(path) => path,
        Err(e) => {
            error!(ean = %ean, error = %e, "Image path lookup failed");
            None
        }
    };

    if let Some(path) = stored {
        if let Some(bytes) = read_if_exists(Path::new(&path)).await {
            return Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response());
        }
        debug!(ean = %ean, path = %path, "Stored image missing on disk");
    }

    match read_if_exists(&state.config.paths.placeholder_image).await {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response()),
        None => Err(ApiError::not_found("Image", ean)),
    }
}

async fn read_if_exists(path: &Path) -> Option<Vec<u8>> {
    tokio::fs::read(path).await.ok()
}

/// `GET /qr`: PNG of the configured mobile URL.
pub async fn mobile_qr(State(state): State<AppState>) -> Result<Response, ApiError> {
    let png = render_qr_png(&state.config.mobile_url)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// Encodes `data` as a QR code PNG.
pub fn render_qr_png(data: &str) -> Result<Vec<u8>, ApiError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| ApiError::internal(format!("QR encoding failed: {}", e)))?;
    let pixels = code.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(pixels)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ApiError::internal(format!("QR rendering failed: {}", e)))?;
    Ok(png)
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub ean: String,
    pub image_path: String,
    pub message: String,
}

/// `POST /upload_image/{ean}` with multipart field `image`.
///
/// Undecodable files are kept as raw bytes and still reported as stored.
pub async fn upload_image(
    State(state): State<AppState>,
    UrlPath(ean): UrlPath<String>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let ean = normalize_barcode(&ean)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid upload: {}", e)))?
    {
        if field.name() == Some(IMAGE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::validation(format!("Invalid upload: {}", e)))?;
            upload = Some(bytes);
            break;
        }
    }

    let bytes = upload
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::validation("No image submitted"))?;

    let stored = state.images.ingest_bytes(&ean, bytes.to_vec()).await?;
    info!(ean = %ean, path = stored.path(), raw = stored.is_raw(), "Upload stored");

    Ok(Json(UploadResponse {
        ok: true,
        ean,
        image_path: stored.path().to_string(),
        message: "Image stored".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qr_is_png() {
        let png = render_qr_png("http://192.168.0.30:8000/mobile").unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert!(decoded.width() >= 256);
        assert_eq!(decoded.width(), decoded.height());
    }
}
