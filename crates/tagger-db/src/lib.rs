//! # tagger-db: Storage Layer for Tagger
//!
//! This crate provides the record store and the image artifact store.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tagger Data Flow                                 │
//! │                                                                         │
//! │  HTTP command / hub event / lookup chain                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tagger-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  ImageStore  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │ (images.rs)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ UserRepo      │◄───│ decode/resize│  │   │
//! │  │   │ Migrations    │    │ ShopRepo      │    │ {ean}.jpg    │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                              │                  │
//! │       ▼                                              ▼                  │
//! │  tagger.db (SQLite)                           images/ directory        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`repository`] - Products, users, shops
//! - [`images`] - Image ingestion
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tagger_core::ProductChanges;
//! use tagger_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tagger.db")).await?;
//!
//! db.products()
//!     .upsert(&ProductChanges::manual("4006381333931", "Stabilo Boss"))
//!     .await?;
//! let record = db.products().get("4006381333931").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod images;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use images::{ImageConfig, ImageStore, StoredImage};
pub use pool::{Database, DbConfig, Storage};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::shop::ShopRepository;
pub use repository::user::UserRepository;
