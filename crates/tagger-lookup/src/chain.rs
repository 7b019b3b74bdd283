//! # Lookup Chain
//!
//! Local store first, then providers in priority order. The first provider
//! returning a non-empty name wins and is cached.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::provider::LookupProvider;
use tagger_core::{ProductChanges, ProductRecord};
use tagger_db::ProductRepository;

/// Resolves barcodes. Cheap to clone.
#[derive(Clone)]
pub struct LookupChain {
    products: ProductRepository,
    providers: Vec<Arc<dyn LookupProvider>>,
}

impl LookupChain {
    pub fn new(products: ProductRepository, providers: Vec<Arc<dyn LookupProvider>>) -> Self {
        LookupChain {
            products,
            providers,
        }
    }

    /// Provider ids in the order they are asked.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Resolves a barcode.
    ///
    /// Never fails. Store and provider faults are logged; a barcode nobody
    /// knows comes back as the placeholder with provenance `none`.
    pub async fn lookup(&self, ean: &str, allow_remote: bool) -> ProductRecord {
        let ean = ean.trim();
        if ean.is_empty() {
            return ProductRecord::placeholder("");
        }

        match self.products.get(ean).await {
            Ok(Some(record)) => {
                debug!(ean = %ean, provenance = %record.provenance, "Served from local store");
                return record;
            }
            Ok(None) => {}
            Err(e) => error!(ean = %ean, error = %e, "Local lookup failed"),
        }

        if !allow_remote {
            return ProductRecord::placeholder(ean);
        }

        for provider in &self.providers {
            let hit = match provider.lookup(ean).await {
                Ok(Some(hit)) if !hit.name.trim().is_empty() => hit,
                Ok(_) => {
                    debug!(ean = %ean, provider = provider.id(), "No result");
                    continue;
                }
                Err(e) => {
                    warn!(ean = %ean, provider = provider.id(), error = %e, "Provider failed");
                    continue;
                }
            };

            info!(ean = %ean, provider = provider.id(), name = %hit.name, "Remote hit");
            let changes = ProductChanges::remote(ean, hit.name, hit.brand, provider.id());

            return match self.products.upsert(&changes).await {
                Ok(record) => record,
                Err(e) => {
                    error!(ean = %ean, error = %e, "Caching remote hit failed");
                    ProductRecord {
                        name: changes.name,
                        brand: changes.brand,
                        provenance: changes.provenance,
                        ..ProductRecord::placeholder(ean)
                    }
                }
            };
        }

        debug!(ean = %ean, "No provider knows this barcode");
        ProductRecord::placeholder(ean)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LookupError, LookupResult};
    use crate::provider::RemoteProduct;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tagger_core::Provenance;
    use tagger_db::{Database, DbConfig};

    enum Answer {
        Hit(&'static str),
        Miss,
        Fault,
    }

    struct FakeProvider {
        id: &'static str,
        answer: Answer,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(id: &'static str, answer: Answer) -> Arc<Self> {
            Arc::new(FakeProvider {
                id,
                answer,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LookupProvider for FakeProvider {
        fn id(&self) -> &str {
            self.id
        }

        async fn lookup(&self, _ean: &str) -> LookupResult<Option<RemoteProduct>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.answer {
                Answer::Hit(name) => Ok(Some(RemoteProduct {
                    name: name.to_string(),
                    brand: Some(format!("{} brand", self.id)),
                })),
                Answer::Miss => Ok(None),
                Answer::Fault => Err(LookupError::Status(503)),
            }
        }
    }

    async fn products() -> ProductRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().products()
    }

    fn chain(products: ProductRepository, providers: &[&Arc<FakeProvider>]) -> LookupChain {
        let providers = providers
            .iter()
            .map(|p| (*p).clone() as Arc<dyn LookupProvider>)
            .collect();
        LookupChain::new(products, providers)
    }

    #[tokio::test]
    async fn test_unknown_without_remote_is_placeholder() {
        let products = products().await;
        let remote = FakeProvider::new("first", Answer::Hit("Cola"));
        let chain = chain(products.clone(), &[&remote]);

        let record = chain.lookup("4006381333931", false).await;
        assert!(record.is_placeholder());
        assert_eq!(record.provenance, Provenance::None);
        assert_eq!(record.ean, "4006381333931");

        assert_eq!(remote.calls(), 0);
        assert_eq!(products.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fault_then_hit_is_cached() {
        let products = products().await;
        let broken = FakeProvider::new("broken", Answer::Fault);
        let empty = FakeProvider::new("empty", Answer::Miss);
        let good = FakeProvider::new("good", Answer::Hit("Club-Mate"));
        let never = FakeProvider::new("never", Answer::Hit("Wrong"));
        let chain = chain(products.clone(), &[&broken, &empty, &good, &never]);

        let record = chain.lookup("4029764001807", true).await;
        assert_eq!(record.name, "Club-Mate");
        assert_eq!(record.brand.as_deref(), Some("good brand"));
        assert_eq!(record.provenance, Provenance::Provider("good".into()));
        assert_eq!(never.calls(), 0);

        // Cached: served locally with the same provenance, providers untouched
        let cached = chain.lookup("4029764001807", false).await;
        assert_eq!(cached.name, record.name);
        assert_eq!(cached.brand, record.brand);
        assert_eq!(cached.provenance, record.provenance);
        assert_eq!(good.calls(), 1);
        assert_eq!(products.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_stored_provenance_preserved() {
        let products = products().await;
        products
            .upsert(&ProductChanges::manual("123", "Hand typed"))
            .await
            .unwrap();
        let remote = FakeProvider::new("x", Answer::Hit("Remote"));
        let chain = chain(products, &[&remote]);

        let record = chain.lookup(" 123 ", true).await;
        assert_eq!(record.name, "Hand typed");
        assert_eq!(record.provenance, Provenance::Manual);
    }

    #[tokio::test]
    async fn test_all_providers_miss() {
        let fault = FakeProvider::new("a", Answer::Fault);
        let blank = FakeProvider::new("b", Answer::Hit("  "));
        let chain = chain(products().await, &[&fault, &blank]);
        assert_eq!(chain.provider_ids(), vec!["a", "b"]);

        let record = chain.lookup("123", true).await;
        assert!(record.is_placeholder());
    }

    #[tokio::test]
    async fn test_empty_barcode() {
        let chain = chain(products().await, &[]);
        let record = chain.lookup("   ", true).await;
        assert!(record.is_placeholder());
        assert_eq!(record.ean, "");
    }
}
