//! # Application State
//!
//! Everything a handler may need, built once at startup and cloned into
//! each request. All members are handles onto shared state.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ ┌──────────────┐   │
//! │  │  Database    │ │ LookupChain  │ │  ImageStore  │ │SessionTracker│   │
//! │  │  (SQLite     │ │ (providers + │ │ (normalize + │ │ (Mutex slot  │   │
//! │  │   pool)      │ │  cache)      │ │  link)       │ │  + hub)      │   │
//! │  └──────────────┘ └──────────────┘ └──────────────┘ └──────────────┘   │
//! │                                                                         │
//! │  ┌──────────────┐ ┌──────────────────────────────────────────────────┐ │
//! │  │  HubHandle   │ │ StationConfig (read-only after startup)          │ │
//! │  └──────────────┘ └──────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tagger_db::{Database, ImageConfig, ImageStore};
use tagger_lookup::{LookupChain, LookupProvider};
use tagger_sync::{HubHandle, SessionTracker};

use crate::config::StationConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StationConfig>,
    pub db: Database,
    pub lookup: LookupChain,
    pub images: ImageStore,
    pub session: SessionTracker,
    pub hub: HubHandle,
}

impl AppState {
    /// Wires the services around an open database.
    pub fn new(
        config: StationConfig,
        db: Database,
        providers: Vec<Arc<dyn LookupProvider>>,
        hub: HubHandle,
    ) -> Self {
        let images = ImageStore::new(
            ImageConfig::new(&config.paths.images)
                .max_side(config.images.max_side)
                .jpeg_quality(config.images.jpeg_quality),
            db.products(),
        );
        let lookup = LookupChain::new(db.products(), providers);
        let session = SessionTracker::new(config.session.timeout_minutes, db.users(), hub.clone());

        AppState {
            config: Arc::new(config),
            db,
            lookup,
            images,
            session,
            hub,
        }
    }
}
