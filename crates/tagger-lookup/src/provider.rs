//! # Lookup Providers
//!
//! The seam between the chain and the remote product databases.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LookupError, LookupResult};
use crate::openfoodfacts::OpenFoodFacts;
use crate::opengtindb::OpenGtinDb;

/// What a provider knows about a barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProduct {
    pub name: String,
    pub brand: Option<String>,
}

/// A remote product database.
///
/// `Ok(None)` is a miss. `Err` is a fault; the chain treats both the same
/// but logs the fault.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Stable identity, stored as the record's provenance on a hit.
    fn id(&self) -> &str;

    async fn lookup(&self, ean: &str) -> LookupResult<Option<RemoteProduct>>;
}

// =============================================================================
// Configuration
// =============================================================================

fn default_providers() -> Vec<String> {
    vec![OpenGtinDb::ID.to_string(), OpenFoodFacts::ID.to_string()]
}

fn default_query_id() -> String {
    // Public test id published by opengtindb.org
    "400000000".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_opengtindb_url() -> String {
    "https://opengtindb.org/".to_string()
}

fn default_openfoodfacts_url() -> String {
    "https://world.openfoodfacts.org".to_string()
}

/// Provider settings, embedded in the station config as `[lookup]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Provider ids in priority order.
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,

    #[serde(default = "default_query_id")]
    pub opengtindb_query_id: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_opengtindb_url")]
    pub opengtindb_url: String,

    #[serde(default = "default_openfoodfacts_url")]
    pub openfoodfacts_url: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        LookupConfig {
            providers: default_providers(),
            opengtindb_query_id: default_query_id(),
            timeout_secs: default_timeout_secs(),
            opengtindb_url: default_opengtindb_url(),
            openfoodfacts_url: default_openfoodfacts_url(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Builds the configured providers in order.
    pub fn build_providers(&self) -> LookupResult<Vec<Arc<dyn LookupProvider>>> {
        let client = http_client(self.timeout())?;

        self.providers
            .iter()
            .map(|id| -> LookupResult<Arc<dyn LookupProvider>> {
                match id.as_str() {
                    OpenGtinDb::ID => Ok(Arc::new(OpenGtinDb::new(
                        client.clone(),
                        &self.opengtindb_url,
                        &self.opengtindb_query_id,
                    ))),
                    OpenFoodFacts::ID => Ok(Arc::new(OpenFoodFacts::new(
                        client.clone(),
                        &self.openfoodfacts_url,
                    ))),
                    other => Err(LookupError::UnknownProvider(other.to_string())),
                }
            })
            .collect()
    }
}

/// Shared client; one connection pool for all providers.
pub fn http_client(timeout: Duration) -> LookupResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tagger/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Trims and drops empty strings.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let config = LookupConfig::default();
        assert_eq!(config.providers, vec!["opengtindb", "openfoodfacts"]);
        assert_eq!(config.timeout(), Duration::from_secs(5));

        let providers = config.build_providers().unwrap();
        let ids: Vec<_> = providers.iter().map(|p| p.id().to_string()).collect();
        assert_eq!(ids, config.providers);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = LookupConfig {
            providers: vec!["upcitemdb".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.build_providers(),
            Err(LookupError::UnknownProvider(id)) if id == "upcitemdb"
        ));
    }
}
