//! # Open Food Facts Provider
//!
//! `GET {base}/api/v0/product/{ean}.json`, hit when `status == 1`.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{LookupError, LookupResult};
use crate::provider::{non_empty, LookupProvider, RemoteProduct};

pub struct OpenFoodFacts {
    client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFacts {
    pub const ID: &'static str = "openfoodfacts";

    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        OpenFoodFacts {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    product: Option<ProductBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductBody {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    brands_tags: Vec<String>,
    #[serde(default)]
    brands: Option<String>,
}

#[async_trait]
impl LookupProvider for OpenFoodFacts {
    fn id(&self) -> &str {
        Self::ID
    }

    async fn lookup(&self, ean: &str) -> LookupResult<Option<RemoteProduct>> {
        let url = format!("{}/api/v0/product/{}.json", self.base_url, ean);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response.json().await?;
        debug!(ean = %ean, "Open Food Facts answered");
        parse_response(body)
    }
}

/// Interprets a product response.
pub fn parse_response(body: serde_json::Value) -> LookupResult<Option<RemoteProduct>> {
    let response: ProductResponse =
        serde_json::from_value(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

    if response.status != 1 {
        return Ok(None);
    }
    let product = response.product.unwrap_or_default();

    let Some(name) = non_empty(product.product_name.as_deref()) else {
        return Ok(None);
    };

    let tags: Vec<&str> = product
        .brands_tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    let brand = if tags.is_empty() {
        non_empty(product.brands.as_deref())
    } else {
        Some(tags.join(", "))
    };

    Ok(Some(RemoteProduct { name, brand }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hit_joins_brand_tags() {
        let body = json!({
            "status": 1,
            "product": {
                "product_name": "Nutella",
                "brands_tags": ["ferrero", "nutella"],
                "brands": "Ferrero"
            }
        });
        let product = parse_response(body).unwrap().unwrap();
        assert_eq!(product.name, "Nutella");
        assert_eq!(product.brand.as_deref(), Some("ferrero, nutella"));
    }

    #[test]
    fn test_parse_brand_fallback() {
        let body = json!({
            "status": 1,
            "product": { "product_name": "Club-Mate", "brands": "Loscher" }
        });
        let product = parse_response(body).unwrap().unwrap();
        assert_eq!(product.brand.as_deref(), Some("Loscher"));
    }

    #[test]
    fn test_parse_misses() {
        assert_eq!(parse_response(json!({"status": 0, "status_verbose": "product not found"})).unwrap(), None);
        assert_eq!(parse_response(json!({"status": 1, "product": {"product_name": ""}})).unwrap(), None);
        assert!(matches!(parse_response(json!("<html>")), Err(LookupError::Malformed(_))));
    }
}
