//! # Tagger Station
//!
//! The process a tagging desk runs: HTTP pages and JSON commands, the
//! WebSocket hub, and the RFID reader.
//!
//! ## Module Organization
//! ```text
//! tagger_station/
//! ├── lib.rs          ◄─── You are here (startup & shutdown)
//! ├── config.rs       ◄─── tagger.toml + TAGGER_* overrides
//! ├── state.rs        ◄─── AppState shared by every handler
//! ├── error.rs        ◄─── ApiError → JSON error responses
//! ├── rfid.rs         ◄─── Serial reader thread
//! └── commands/
//!     ├── mod.rs      ◄─── Router
//!     ├── product.rs  ◄─── lookup_ean, save_item
//!     ├── session.rs  ◄─── login, logout, current_user, session_timeout
//!     ├── shop.rs     ◄─── shops
//!     ├── image.rs    ◄─── /image, /upload_image, /qr
//!     └── pages.rs    ◄─── HTML pages, health
//! ```
//!
//! ## Threads
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main runtime (multi-thread)   HTTP server, lookup chain, DB pool      │
//! │  tagger-hub (own runtime)      WebSocket hub, dispatcher               │
//! │  tagger-rfid (plain thread)    blocking serial reads                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod rfid;
pub mod state;

use std::path::PathBuf;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use config::StationConfig;
use state::AppState;
use tagger_db::{Database, DbConfig};
use tagger_sync::{HubHandle, HubServer, InboundHandler};

/// Runs the station until Ctrl+C or SIGTERM.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  1. Logging (RUST_LOG, default info,tagger=debug,sqlx=warn)             │
/// │  2. Config (first CLI argument, TAGGER_CONFIG, or platform config dir)  │
/// │  3. Database (WAL, migrations, schema probe)                            │
/// │  4. Lookup providers from [lookup]                                      │
/// │  5. Hub thread (a bind failure leaves the hub stopped; HTTP still runs) │
/// │  6. RFID monitor thread if [rfid] enabled                               │
/// │  7. HTTP server until shutdown signal                                   │
/// │  8. Stop hub, close pool                                                │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting tagging station");

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = StationConfig::load(config_path).context("loading station config")?;
    info!(
        http = %config.http.bind_address(),
        hub = %config.hub.bind_address(),
        db = %config.database.path.display(),
        "Configuration loaded"
    );

    std::fs::create_dir_all(&config.paths.images)
        .with_context(|| format!("creating image directory {}", config.paths.images.display()))?;

    let db = Database::new(
        DbConfig::new(&config.database.path).max_connections(config.database.max_connections),
    )
    .await
    .context("opening database")?;
    info!("Database connected and migrations applied");

    let providers = config.lookup.build_providers().context("building lookup providers")?;

    let http_addr = config.http.bind_address();
    let hub_config = config.hub.clone();
    let rfid = config.rfid.clone();

    let hub = HubHandle::new();
    let state = AppState::new(config, db.clone(), providers, hub.clone());

    let inbound = InboundHandler::new(hub.clone(), db.products(), state.images.clone());
    let running_hub = match HubServer::new(hub_config, hub, inbound).start().await {
        Ok(running) => {
            info!(addr = %running.local_addr(), "Hub listening");
            Some(running)
        }
        Err(e) => {
            error!(error = %e, "Hub failed to start; pages will not sync");
            None
        }
    };

    if rfid.enabled {
        rfid::spawn_monitor(rfid, state.session.clone(), tokio::runtime::Handle::current())
            .context("starting RFID monitor")?;
    } else {
        info!("RFID monitor disabled");
    }

    let listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", http_addr))?;
    info!(addr = %http_addr, "HTTP server listening");

    axum::serve(listener, commands::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server")?;

    info!("Shutting down");
    if let Some(running) = running_hub {
        running.stop().await;
    }
    db.close().await;
    info!("Shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tagger_sync=trace` - Trace the hub only
/// - Default: `info,tagger=debug,sqlx=warn`
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tagger=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
