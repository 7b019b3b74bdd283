//! # Image Ingestion
//!
//! Turns an uploaded photo into a normalized JPEG next to the database and
//! links it to the product record.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  base64 payload ──► bytes ──► decode ──┬── ok ──► RGB8                 │
//! │  (hub)              (HTTP)             │            │                   │
//! │                                        │            ▼                   │
//! │                                        │   longest side > max? resize  │
//! │                                        │            │                   │
//! │                                        │            ▼                   │
//! │                                        │   {ean}.jpg (quality N)        │
//! │                                        │            │                   │
//! │                                        │            ▼                   │
//! │                                        │   products.image_path = path   │
//! │                                        │                                │
//! │                                        └── err ─► {ean}_raw.bin         │
//! │                                                   (record untouched)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Re-uploading for the same barcode overwrites the previous file. Decoding
//! and encoding run on the blocking pool.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;

/// Longest side of a stored image, in pixels.
pub const DEFAULT_MAX_SIDE: u32 = 800;

/// JPEG quality of a stored image.
pub const DEFAULT_JPEG_QUALITY: u8 = 70;

// =============================================================================
// Configuration
// =============================================================================

/// Normalization settings.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Directory the artifacts are written to. Created on first write.
    pub dir: PathBuf,
    pub max_side: u32,
    pub jpeg_quality: u8,
}

impl ImageConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ImageConfig {
            dir: dir.into(),
            max_side: DEFAULT_MAX_SIDE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn max_side(mut self, max_side: u32) -> Self {
        self.max_side = max_side;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}

// =============================================================================
// Result
// =============================================================================

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredImage {
    /// Decoded and re-encoded; the record points at it.
    Normalized {
        path: String,
        width: u32,
        height: u32,
    },
    /// Could not be decoded; bytes kept verbatim, record untouched.
    Raw { path: String },
}

impl StoredImage {
    pub fn path(&self) -> &str {
        match self {
            StoredImage::Normalized { path, .. } | StoredImage::Raw { path } => path,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, StoredImage::Raw { .. })
    }
}

// =============================================================================
// Image Store
// =============================================================================

/// Writes image artifacts and links them to product records.
#[derive(Debug, Clone)]
pub struct ImageStore {
    config: ImageConfig,
    products: ProductRepository,
}

impl ImageStore {
    pub fn new(config: ImageConfig, products: ProductRepository) -> Self {
        ImageStore { config, products }
    }

    /// Path of the normalized artifact for a barcode (may not exist yet).
    pub fn path_for(&self, ean: &str) -> PathBuf {
        self.config.dir.join(format!("{}.jpg", file_stem(ean)))
    }

    /// Ingests a base64 payload as sent over the hub.
    ///
    /// Invalid base64 is an error. Undecodable image data is not.
    pub async fn ingest_base64(&self, ean: &str, payload: &str) -> DbResult<StoredImage> {
        let bytes = STANDARD.decode(strip_data_url(payload).trim())?;
        self.ingest_bytes(ean, bytes).await
    }

    /// Ingests raw upload bytes.
    pub async fn ingest_bytes(&self, ean: &str, bytes: Vec<u8>) -> DbResult<StoredImage> {
        let config = self.config.clone();
        let stem = file_stem(ean);

        let stored = tokio::task::spawn_blocking(move || normalize_and_write(&config, &stem, bytes))
            .await
            .map_err(|e| DbError::Internal(format!("image task failed: {e}")))??;

        if let StoredImage::Normalized { path, .. } = &stored {
            self.products.set_image(ean, path).await?;
        }

        Ok(stored)
    }
}

/// Blocking half of ingestion.
fn normalize_and_write(config: &ImageConfig, stem: &str, bytes: Vec<u8>) -> DbResult<StoredImage> {
    fs::create_dir_all(&config.dir)?;

    let decoded = match image::load_from_memory(&bytes) {
        Ok(img) => img,
        Err(e) => {
            let path = config.dir.join(format!("{stem}_raw.bin"));
            warn!(ean = %stem, error = %e, path = %path.display(), "Image not decodable, keeping raw bytes");
            fs::write(&path, &bytes)?;
            return Ok(StoredImage::Raw {
                path: path_string(&path),
            });
        }
    };

    let (orig_w, orig_h) = (decoded.width(), decoded.height());
    let decoded = if orig_w.max(orig_h) > config.max_side {
        decoded.resize(config.max_side, config.max_side, FilterType::Lanczos3)
    } else {
        decoded
    };
    let rgb = decoded.to_rgb8();

    let path = config.dir.join(format!("{stem}.jpg"));
    let mut writer = BufWriter::new(File::create(&path)?);
    JpegEncoder::new_with_quality(&mut writer, config.jpeg_quality).encode_image(&rgb)?;

    info!(
        ean = %stem,
        path = %path.display(),
        original = %format!("{orig_w}x{orig_h}"),
        stored = %format!("{}x{}", rgb.width(), rgb.height()),
        "Image stored"
    );

    Ok(StoredImage::Normalized {
        path: path_string(&path),
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Barcodes are externally issued; keep only characters safe in a file name.
fn file_stem(ean: &str) -> String {
    ean.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Browsers send `data:image/jpeg;base64,....` from canvas captures.
fn strip_data_url(payload: &str) -> &str {
    match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// =============================================================================
// Unit Tests
// =============================================================================
