//! # Domain Types
//!
//! Core domain types used throughout Tagger.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductRecord   │   │      User       │   │      Shop       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  ean (PK)       │   │  id             │   │  id             │       │
//! │  │  name, brand    │   │  name           │   │  code           │       │
//! │  │  qty, shop_id   │   │  rfid_uid       │   │  name           │       │
//! │  │  image_path     │   └─────────────────┘   └─────────────────┘       │
//! │  │  provenance     │                                                    │
//! │  └─────────────────┘   ┌─────────────────┐   ┌─────────────────┐       │
//! │                        │ CurrentArticle  │   │   Provenance    │       │
//! │                        │  ean, name      │   │  local, manual  │       │
//! │                        │  image_path     │   │  <provider>     │       │
//! │                        └─────────────────┘   │  image-only     │       │
//! │                                              │  none           │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Users and shops are read-only here; an external directory owns them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Provenance
// =============================================================================

/// Where a product record's data came from.
///
/// Stored and serialized as a plain string so that new remote providers
/// never need a schema change: anything that is not one of the fixed tags
/// is the identity of the provider that produced the record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provenance {
    /// Served from the local store without further detail.
    Local,
    /// Entered by hand on the desktop or phone.
    Manual,
    /// Fetched from a remote product database; holds the provider id.
    Provider(String),
    /// Created only to hold an uploaded photo.
    ImageOnly,
    /// Nothing known about this barcode.
    None,
}

impl Provenance {
    /// Returns the stored/wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Provenance::Local => "local",
            Provenance::Manual => "manual",
            Provenance::Provider(id) => id,
            Provenance::ImageOnly => "image-only",
            Provenance::None => "none",
        }
    }

    /// Parses a stored tag. Empty strings read as `local`, which is what
    /// rows written before provenance existed mean.
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "" | "local" => Provenance::Local,
            "manual" => Provenance::Manual,
            "image-only" => Provenance::ImageOnly,
            "none" => Provenance::None,
            other => Provenance::Provider(other.to_string()),
        }
    }

    /// Returns true for records that came from a remote lookup.
    pub fn is_remote(&self) -> bool {
        matches!(self, Provenance::Provider(_))
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance::None
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Provenance {
    fn from(tag: String) -> Self {
        Provenance::parse(&tag)
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.as_str().to_string()
    }
}

// =============================================================================
// Product Record
// =============================================================================

/// A product keyed by its barcode.
///
/// ## Field Preservation
/// Writes are last-write-wins per field, not per record: a save that does
/// not carry an image keeps the stored one (see `ProductChanges`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRecord {
    /// Barcode (EAN-13, EAN-8, UPC-A, ...). Primary key.
    pub ean: String,

    /// Display name.
    pub name: String,

    /// Brand or vendor, if known.
    pub brand: Option<String>,

    /// Quantity on hand. Never negative.
    pub qty: f64,

    /// Shop the article is bought from.
    pub shop_id: Option<i64>,

    /// Path of the stored photo.
    pub image_path: Option<String>,

    /// User who last changed the record.
    pub last_user_id: Option<i64>,

    /// When the record was last changed.
    #[ts(as = "Option<String>")]
    pub last_change_at: Option<DateTime<Utc>>,

    /// Where the data came from.
    #[ts(as = "String")]
    pub provenance: Provenance,
}

impl ProductRecord {
    /// The empty record returned when nothing is known about a barcode.
    ///
    /// This is a normal result, not an error: it tells the caller to offer
    /// manual entry.
    pub fn placeholder(ean: impl Into<String>) -> Self {
        ProductRecord {
            ean: ean.into(),
            name: String::new(),
            brand: None,
            qty: 0.0,
            shop_id: None,
            image_path: None,
            last_user_id: None,
            last_change_at: None,
            provenance: Provenance::None,
        }
    }

    /// Returns true if this record is the "nothing known" placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.provenance == Provenance::None
    }
}

// =============================================================================
// Product Changes
// =============================================================================

/// A write against a product record.
///
/// `None` means "keep what is stored" for every optional field. An empty
/// name on an existing record also keeps the stored name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductChanges {
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub qty: Option<f64>,
    pub shop_id: Option<i64>,
    pub image_path: Option<String>,
    pub last_user_id: Option<i64>,
    pub provenance: Provenance,
}

impl ProductChanges {
    /// A manual save from the desktop or phone.
    pub fn manual(ean: impl Into<String>, name: impl Into<String>) -> Self {
        ProductChanges {
            ean: ean.into(),
            name: name.into(),
            provenance: Provenance::Manual,
            ..Default::default()
        }
    }

    /// A remote hit being cached locally.
    pub fn remote(
        ean: impl Into<String>,
        name: impl Into<String>,
        brand: Option<String>,
        provider: impl Into<String>,
    ) -> Self {
        ProductChanges {
            ean: ean.into(),
            name: name.into(),
            brand,
            provenance: Provenance::Provider(provider.into()),
            ..Default::default()
        }
    }

    pub fn with_qty(mut self, qty: Option<f64>) -> Self {
        self.qty = qty;
        self
    }

    pub fn with_shop(mut self, shop_id: Option<i64>) -> Self {
        self.shop_id = shop_id;
        self
    }

    pub fn with_user(mut self, user_id: Option<i64>) -> Self {
        self.last_user_id = user_id;
        self
    }
}

// =============================================================================
// User
// =============================================================================

/// A person who can log in with an RFID tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub name: String,
    /// RFID tag UID. Matched case-insensitively.
    pub rfid_uid: String,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>, rfid_uid: impl Into<String>) -> Self {
        User {
            id,
            name: name.into(),
            rfid_uid: rfid_uid.into(),
        }
    }
}

// =============================================================================
// Shop
// =============================================================================

/// A shop an article can be attributed to. Display/selection only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shop {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub web_url: Option<String>,
}

// =============================================================================
// Current Article
// =============================================================================

/// The article the desktop is currently showing.
///
/// Held in memory by the hub so that a phone joining late can ask for it.
/// Never written to the store directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CurrentArticle {
    pub ean: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl CurrentArticle {
    pub fn new(ean: impl Into<String>, name: impl Into<String>) -> Self {
        CurrentArticle {
            ean: ean.into(),
            name: name.into(),
            image_path: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_tags() {
        assert_eq!(Provenance::parse("manual"), Provenance::Manual);
        assert_eq!(Provenance::parse("image-only"), Provenance::ImageOnly);
        assert_eq!(Provenance::parse(""), Provenance::Local);
        assert_eq!(
            Provenance::parse("openfoodfacts"),
            Provenance::Provider("openfoodfacts".to_string())
        );
        assert_eq!(Provenance::ImageOnly.as_str(), "image-only");
    }

    #[test]
    fn test_provenance_serializes_as_string() {
        let json = serde_json::to_string(&Provenance::Provider("opengtindb".into())).unwrap();
        assert_eq!(json, "\"opengtindb\"");

        let back: Provenance = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(back, Provenance::None);
    }

    #[test]
    fn test_placeholder() {
        let record = ProductRecord::placeholder("4006381333931");
        assert!(record.is_placeholder());
        assert_eq!(record.qty, 0.0);
        assert!(record.name.is_empty());
    }

    #[test]
    fn test_current_article_omits_missing_image() {
        let json = serde_json::to_value(CurrentArticle::new("123", "Tea")).unwrap();
        assert!(json.get("image_path").is_none());
        assert_eq!(json["ean"], "123");
    }
}
