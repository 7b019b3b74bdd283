//! # tagger-lookup: Barcode Resolution
//!
//! Turns a scanned barcode into display data.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  lookup(ean, allow_remote)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  local store ── hit ──────────────────────────► record (stored source) │
//! │       │ miss                                                            │
//! │       ▼                                                                 │
//! │  allow_remote? ── no ─────────────────────────► placeholder ("none")   │
//! │       │ yes                                                             │
//! │       ▼                                                                 │
//! │  provider 1 ── name ──► cache ────────────────► record (provider id)   │
//! │       │ miss / error (logged)                                          │
//! │       ▼                                                                 │
//! │  provider 2 ── name ──► cache ────────────────► record (provider id)   │
//! │       │ miss / error (logged)                                          │
//! │       ▼                                                                 │
//! │  placeholder ("none")                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A miss is never an error: the placeholder tells the pages to offer
//! manual entry.
//!
//! ## Modules
//!
//! - [`provider`] - The `LookupProvider` trait and shared HTTP settings
//! - [`opengtindb`] - opengtindb.org (text protocol)
//! - [`openfoodfacts`] - Open Food Facts (JSON)
//! - [`chain`] - Orchestration and caching
//! - [`error`] - Provider error types

pub mod chain;
pub mod error;
pub mod openfoodfacts;
pub mod opengtindb;
pub mod provider;

pub use chain::LookupChain;
pub use error::{LookupError, LookupResult};
pub use openfoodfacts::OpenFoodFacts;
pub use opengtindb::OpenGtinDb;
pub use provider::{LookupConfig, LookupProvider, RemoteProduct};
