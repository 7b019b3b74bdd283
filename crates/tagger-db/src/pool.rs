//! # Database Pool
//!
//! One SQLite pool per process, shared by three threads.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Touches the Pool                                 │
//! │                                                                         │
//! │   HTTP runtime              hub thread              RFID thread        │
//! │   lookup_ean, save_item     save_name, uploads      login_by_tag       │
//! │        │                         │                        │             │
//! │        └────────────┬────────────┴────────────┬───────────┘             │
//! │                     ▼                         ▼                         │
//! │              ┌─────────────────────────────────────┐                    │
//! │              │  SqlitePool (WAL, busy_timeout)     │                    │
//! │              └─────────────────────────────────────┘                    │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │   ProductRepository · UserRepository · ShopRepository                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository call is a single statement, so no transaction ever
//! spans threads. WAL lets the pages keep reading while a save commits;
//! `busy_timeout` covers the rare case of two writers colliding.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::product::ProductRepository;
use crate::repository::shop::ShopRepository;
use crate::repository::user::UserRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// A database file, created on first open.
    File(PathBuf),
    /// A private in-memory database. Tests only.
    Memory,
}

/// Pool settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("tagger.db").max_connections(5);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub storage: Storage,
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    /// Apply embedded migrations on open. When off, the schema is only probed.
    pub migrate: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            storage: Storage::File(path.into()),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(10),
            migrate: true,
        }
    }

    /// A migrated in-memory database.
    ///
    /// Pinned to one connection: each SQLite connection to `:memory:` would
    /// otherwise see its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            storage: Storage::Memory,
            max_connections: 1,
            ..DbConfig::new(PathBuf::new())
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn migrate(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = match &self.storage {
            Storage::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal),
            Storage::Memory => SqliteConnectOptions::new().in_memory(true),
        };
        options
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(self.busy_timeout)
    }

    fn describe(&self) -> String {
        match &self.storage {
            Storage::File(path) => path.display().to_string(),
            Storage::Memory => ":memory:".to_string(),
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle onto the shared pool. Clones share the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool, then migrates or probes the schema.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        let target = config.describe();
        info!(storage = %target, max_connections = config.max_connections, "Opening database");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.storage == Storage::Memory {
            // Dropping the last connection would drop the data.
            pool_options = pool_options.min_connections(1).idle_timeout(None).max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| DbError::ConnectionFailed(format!("{}: {}", target, e)))?;
        debug!(storage = %target, "Pool connected");

        let db = Database { pool };
        if config.migrate {
            db.run_migrations().await?;
        } else {
            migrations::probe_schema(&db.pool).await?;
        }
        Ok(db)
    }

    /// Applies pending embedded migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        info!("Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn shops(&self) -> ShopRepository {
        ShopRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool. Later calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database closed");
    }

    /// `true` if a trivial query succeeds.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
