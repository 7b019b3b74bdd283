//! # Shop Repository
//!
//! Read-only shop list for the selector on the pages.
//!
//! The table is optional: a database shared with an older schema may not
//! have it. Listing probes first and degrades to an empty list, so the
//! pages never see a shop error.

use sqlx::{FromRow, SqlitePool};
use tracing::{debug, error};

use crate::error::DbResult;
use crate::migrations::table_exists;
use tagger_core::Shop;

#[derive(Debug, FromRow)]
struct ShopRow {
    id: i64,
    code: String,
    name: String,
    web_url: Option<String>,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Shop {
            id: row.id,
            code: row.code,
            name: row.name,
            web_url: row.web_url,
        }
    }
}

/// Repository for shops.
#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    /// Creates a new ShopRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Lists shops ordered by name.
    ///
    /// Never fails: a missing table or a storage fault yields an empty list.
    pub async fn list(&self) -> Vec<Shop> {
        match self.try_list().await {
            Ok(shops) => shops,
            Err(e) => {
                error!(error = %e, "Listing shops failed");
                Vec::new()
            }
        }
    }

    async fn try_list(&self) -> DbResult<Vec<Shop>> {
        if !table_exists(&self.pool, "shops").await? {
            debug!("Table 'shops' does not exist, returning empty list");
            return Ok(Vec::new());
        }

        let shops = sqlx::query_as::<_, ShopRow>(
            "SELECT id, code, name, web_url FROM shops ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(shops.into_iter().map(Shop::from).collect())
    }

    /// Adds a shop. Development seeding only.
    pub async fn insert(&self, code: &str, name: &str, web_url: Option<&str>) -> DbResult<Shop> {
        let id = sqlx::query("INSERT INTO shops (code, name, web_url) VALUES (?1, ?2, ?3)")
            .bind(code)
            .bind(name)
            .bind(web_url)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Shop {
            id,
            code: code.to_string(),
            name: name.to_string(),
            web_url: web_url.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let shops = Database::new(DbConfig::in_memory()).await.unwrap().shops();
        shops.insert("REWE", "Rewe", None).await.unwrap();
        shops.insert("ALDI", "Aldi Süd", Some("https://www.aldi-sued.de")).await.unwrap();

        let list = shops.list().await;
        let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Aldi Süd", "Rewe"]);
        assert_eq!(list[0].web_url.as_deref(), Some("https://www.aldi-sued.de"));
    }

    #[tokio::test]
    async fn test_missing_table_degrades_to_empty() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("DROP TABLE shops").execute(db.pool()).await.unwrap();

        assert!(db.shops().list().await.is_empty());
    }
}
