//! # Repository Module
//!
//! Database repository implementations for Tagger.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP command / hub event                                              │
//! │       │                                                                 │
//! │       │  db.products().upsert(&changes)                                │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get(&self, ean)                                                   │
//! │  ├── upsert(&self, changes)                                            │
//! │  └── set_image(&self, ean, path)                                       │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Product records keyed by barcode
//! - [`UserRepository`](user::UserRepository) - RFID tag → user resolution
//! - [`ShopRepository`](shop::ShopRepository) - Shop reference list
//!
//! Queries are built at runtime (`sqlx::query_as` + `FromRow`) so the crate
//! compiles without a prepared database.

pub mod product;
pub mod shop;
pub mod user;
