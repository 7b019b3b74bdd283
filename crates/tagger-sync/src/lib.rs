//! # tagger-sync: Real-Time Layer for Tagger
//!
//! Keeps the desktop page and the phones showing the same article, and
//! tells every page who is logged in.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Real-Time Architecture                           │
//! │                                                                         │
//! │  ┌────────────────┐   events    ┌─────────────────────────────────────┐ │
//! │  │ SessionTracker │ ──────────▶ │              HubHandle              │ │
//! │  │  login/logout  │             │  broadcast_from_anywhere (any thread)│ │
//! │  └────────────────┘             └──────────────────┬──────────────────┘ │
//! │                                                    │ commands           │
//! │  ┌─────────────────────────────────────────────────▼──────────────────┐ │
//! │  │                 HubServer (dedicated thread)                       │ │
//! │  │                                                                    │ │
//! │  │  dispatcher ── PeerRegistry, current article                       │ │
//! │  │  connections ── InboundHandler (set_article, upload_image, ...)    │ │
//! │  └────────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`hub`] - Server, handle, lifecycle, dispatcher
//! - [`registry`] - Live peer set with prune-on-failure broadcast
//! - [`protocol`] - Wire messages
//! - [`inbound`] - Handling of page requests
//! - [`session`] - Login slot publishing through the hub
//! - [`error`] - Error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod hub;
pub mod inbound;
pub mod protocol;
pub mod registry;
pub mod session;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{SyncError, SyncResult};
pub use hub::{Dispatch, HubConfig, HubHandle, HubServer, Lifecycle, RunningHub, DEFAULT_HUB_PORT};
pub use inbound::InboundHandler;
pub use protocol::{HubMessage, InboundMessage};
pub use registry::{BroadcastReport, PeerContext, PeerId, PeerRegistry};
pub use session::{LoginOutcome, SessionTracker};
