//! # Product Repository
//!
//! Database operations for product records.
//!
//! ## Field Preservation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Statement Per Write                              │
//! │                                                                         │
//! │  ProductChanges { image_path: None, qty: Some(3), name: "" }           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT(ean) DO UPDATE SET                             │
//! │       name       = stored name   (incoming is empty)                   │
//! │       qty        = 3                                                    │
//! │       image_path = stored path   (incoming is NULL)                    │
//! │       ...                                                               │
//! │                                                                         │
//! │  No read step, so two concurrent saves for one barcode cannot both     │
//! │  read a stale row. Last write still wins per field.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tagger_core::{ProductChanges, ProductRecord, Provenance};

/// Row shape of the `products` table.
#[derive(Debug, FromRow)]
struct ProductRow {
    ean: String,
    name: String,
    brand: Option<String>,
    qty: f64,
    shop_id: Option<i64>,
    image_path: Option<String>,
    last_user_id: Option<i64>,
    last_change_at: Option<DateTime<Utc>>,
    source: String,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        ProductRecord {
            ean: row.ean,
            name: row.name,
            brand: row.brand,
            qty: row.qty,
            shop_id: row.shop_id,
            image_path: row.image_path,
            last_user_id: row.last_user_id,
            last_change_at: row.last_change_at,
            provenance: Provenance::parse(&row.source),
        }
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT ean, name, brand, qty, shop_id, image_path,
           last_user_id, last_change_at, source
    FROM products
"#;

/// Single-statement upsert.
///
/// - an empty incoming name keeps the stored name
/// - NULL optional fields keep the stored value
/// - an image-only write keeps the stored provenance
const UPSERT: &str = r#"
    INSERT INTO products
        (ean, name, brand, qty, shop_id, image_path, last_user_id, last_change_at, source)
    VALUES (?1, ?2, ?3, COALESCE(?4, 0), ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(ean) DO UPDATE SET
        name           = CASE WHEN excluded.name = '' THEN products.name ELSE excluded.name END,
        brand          = COALESCE(excluded.brand, products.brand),
        qty            = COALESCE(?4, products.qty),
        shop_id        = COALESCE(excluded.shop_id, products.shop_id),
        image_path     = COALESCE(excluded.image_path, products.image_path),
        last_user_id   = COALESCE(excluded.last_user_id, products.last_user_id),
        last_change_at = excluded.last_change_at,
        source         = CASE WHEN excluded.source = 'image-only'
                              THEN products.source ELSE excluded.source END
"#;

/// Repository for product records.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
///
/// repo.upsert(&ProductChanges::manual("4006381333931", "Stabilo Boss")).await?;
/// let record = repo.get("4006381333931").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a record by barcode.
    ///
    /// ## Returns
    /// * `Ok(Some(ProductRecord))` - Record found
    /// * `Ok(None)` - Nothing stored for this barcode
    pub async fn get(&self, ean: &str) -> DbResult<Option<ProductRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE ean = ?1");

        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(ean)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ProductRecord::from))
    }

    /// Creates or updates a record, keeping stored values for every field
    /// the changes leave unset. Returns the stored record.
    ///
    /// The barcode must already be normalized; callers validate it.
    pub async fn upsert(&self, changes: &ProductChanges) -> DbResult<ProductRecord> {
        debug!(
            ean = %changes.ean,
            provenance = %changes.provenance,
            "Upserting product"
        );

        sqlx::query(UPSERT)
            .bind(&changes.ean)
            .bind(&changes.name)
            .bind(&changes.brand)
            .bind(changes.qty)
            .bind(changes.shop_id)
            .bind(&changes.image_path)
            .bind(changes.last_user_id)
            .bind(Utc::now())
            .bind(changes.provenance.as_str())
            .execute(&self.pool)
            .await?;

        self.get(&changes.ean)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &changes.ean))
    }

    /// Points a record at a new image, creating an image-only record if the
    /// barcode is unknown.
    pub async fn set_image(&self, ean: &str, image_path: &str) -> DbResult<ProductRecord> {
        let changes = ProductChanges {
            ean: ean.to_string(),
            image_path: Some(image_path.to_string()),
            provenance: Provenance::ImageOnly,
            ..Default::default()
        };
        self.upsert(&changes).await
    }

    /// Returns the stored image path for a barcode, if any.
    pub async fn image_path(&self, ean: &str) -> DbResult<Option<String>> {
        let path: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_path FROM products WHERE ean = ?1")
                .bind(ean)
                .fetch_optional(&self.pool)
                .await?;

        Ok(path.flatten())
    }

    /// Counts stored records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn repo() -> ProductRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().products()
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let repo = repo().await;
        assert!(repo.get("0000000000000").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_manual_save_roundtrip() {
        let repo = repo().await;

        let changes = ProductChanges::manual("4006381333931", "Stabilo Boss")
            .with_qty(Some(3.0))
            .with_shop(Some(2))
            .with_user(Some(7));
        let saved = repo.upsert(&changes).await.unwrap();

        assert_eq!(saved.name, "Stabilo Boss");
        assert_eq!(saved.qty, 3.0);
        assert_eq!(saved.shop_id, Some(2));
        assert_eq!(saved.last_user_id, Some(7));
        assert_eq!(saved.provenance, Provenance::Manual);
        assert!(saved.last_change_at.is_some());
    }

    #[tokio::test]
    async fn test_image_survives_later_save() {
        let repo = repo().await;

        repo.set_image("123", "images/123.jpg").await.unwrap();
        repo.upsert(&ProductChanges::manual("123", "Tea")).await.unwrap();

        let record = repo.get("123").await.unwrap().unwrap();
        assert_eq!(record.name, "Tea");
        assert_eq!(record.image_path.as_deref(), Some("images/123.jpg"));
    }

    #[tokio::test]
    async fn test_unset_fields_are_kept() {
        let repo = repo().await;

        repo.upsert(
            &ProductChanges::manual("123", "Tea")
                .with_qty(Some(4.0))
                .with_shop(Some(1))
                .with_user(Some(9)),
        )
        .await
        .unwrap();

        // Empty name and no qty/shop/user: everything stays
        let record = repo.upsert(&ProductChanges::manual("123", "")).await.unwrap();
        assert_eq!(record.name, "Tea");
        assert_eq!(record.qty, 4.0);
        assert_eq!(record.shop_id, Some(1));
        assert_eq!(record.last_user_id, Some(9));
    }

    #[tokio::test]
    async fn test_image_only_placeholder() {
        let repo = repo().await;

        let record = repo.set_image("999", "images/999.jpg").await.unwrap();
        assert_eq!(record.provenance, Provenance::ImageOnly);
        assert_eq!(record.name, "");
        assert_eq!(record.qty, 0.0);

        // A later image on a named record keeps its provenance
        repo.upsert(&ProductChanges::remote("999", "Cola", None, "openfoodfacts"))
            .await
            .unwrap();
        let record = repo.set_image("999", "images/999.jpg").await.unwrap();
        assert_eq!(record.provenance, Provenance::Provider("openfoodfacts".into()));
        assert_eq!(repo.image_path("999").await.unwrap().as_deref(), Some("images/999.jpg"));
    }

    #[tokio::test]
    async fn test_negative_qty_rejected_by_schema() {
        let repo = repo().await;
        let result = repo
            .upsert(&ProductChanges::manual("123", "Tea").with_qty(Some(-1.0)))
            .await;
        assert!(matches!(result, Err(DbError::QueryFailed(_))));
        assert!(repo.get("123").await.unwrap().is_none());
    }
}
