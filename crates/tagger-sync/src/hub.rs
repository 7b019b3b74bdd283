//! # Broadcast Hub
//!
//! WebSocket server that keeps every open page in step: the desktop page
//! announces the article it shows, phones follow along, and server-side
//! events (logins, uploads) reach everyone.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Broadcast Hub Architecture                       │
//! │                                                                         │
//! │  HTTP handlers ─┐                                                       │
//! │  RFID thread   ─┼── HubHandle::broadcast_from_anywhere ──┐             │
//! │  session       ─┘        (any thread, never blocks)      │             │
//! │                                                          ▼             │
//! │  ┌──────────────────────── hub thread ─────────────────────────────┐   │
//! │  │                                                                 │   │
//! │  │   commands ──▶ ┌──────────────┐     owns: PeerRegistry          │   │
//! │  │                │  dispatcher  │           current article       │   │
//! │  │                └──────┬───────┘                                 │   │
//! │  │                       │ per-peer queues                         │   │
//! │  │         ┌─────────────┼─────────────┐                           │   │
//! │  │         ▼             ▼             ▼                           │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐                      │   │
//! │  │   │ desktop  │  │ phone #1 │  │ phone #2 │  one writer task     │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  + one reader each   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//!   NotStarted ──start()──▶ Running ──stop()──▶ Stopped
//!        │                                         ▲
//!        └──────────── bind failure ───────────────┘
//! ```
//! Only a `Running` hub accepts work. Messages handed to a hub in any other
//! state are logged and dropped; there is no queue for late starters.
//!
//! ## Threading
//! The server runs on its own OS thread with a single-threaded runtime. Each
//! connection reads one frame, handles it to completion, then reads the next.
//! The peer set and the current article live inside the dispatcher task and
//! are only reached through commands.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::inbound::InboundHandler;
use crate::protocol::HubMessage;
use crate::registry::{PeerContext, PeerId, PeerRegistry};
use tagger_core::CurrentArticle;

// =============================================================================
// Constants
// =============================================================================

/// Default WebSocket port for the hub server.
pub const DEFAULT_HUB_PORT: u16 = 8765;

/// Ping interval to keep connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Hub Configuration
// =============================================================================

fn default_port() -> u16 {
    DEFAULT_HUB_PORT
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

/// Configuration for the hub server. Embedded in the station config as `[hub]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Port to listen on. 0 picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address (default: 0.0.0.0).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Largest accepted frame in bytes. `None` means unbounded; photos
    /// arrive base64-inline.
    #[serde(default)]
    pub max_message_size: Option<usize>,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            port: DEFAULT_HUB_PORT,
            bind_addr: default_bind_addr(),
            max_message_size: None,
        }
    }
}

impl HubConfig {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Frame limit handed to the WebSocket upgrade.
    fn frame_limit(&self) -> usize {
        self.max_message_size.unwrap_or(usize::MAX)
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Lifecycle {
    NotStarted = 0,
    Running = 1,
    Stopped = 2,
}

impl Lifecycle {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Lifecycle::NotStarted,
            1 => Lifecycle::Running,
            _ => Lifecycle::Stopped,
        }
    }
}

/// What happened to a message handed to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Queued for the dispatcher. Delivery is not awaited.
    Scheduled,
    /// Dropped: the hub is not running.
    NotRunning,
}

// =============================================================================
// Commands
// =============================================================================

/// Work for the dispatcher task.
pub(crate) enum HubCommand {
    Join(PeerContext),
    Leave(PeerId),
    Broadcast(HubMessage),
    /// Replace the snapshot and broadcast it.
    SetArticle(CurrentArticle),
    /// Send the snapshot to one peer, if there is one.
    SendSnapshot(PeerId),
    PeerCount(oneshot::Sender<usize>),
    Snapshot(oneshot::Sender<Option<CurrentArticle>>),
    Shutdown,
}

// =============================================================================
// Hub Handle
// =============================================================================

struct HubShared {
    lifecycle: AtomicU8,
    commands: UnboundedSender<HubCommand>,
    /// Taken by the server on start.
    receiver: Mutex<Option<UnboundedReceiver<HubCommand>>>,
}

/// Thread-safe entry point to the hub. Cheap to clone.
///
/// Created before the server so that collaborators (session tracker, HTTP
/// handlers, RFID thread) can hold it from the start.
#[derive(Clone)]
pub struct HubHandle {
    shared: Arc<HubShared>,
}

impl Default for HubHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl HubHandle {
    pub fn new() -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        HubHandle {
            shared: Arc::new(HubShared {
                lifecycle: AtomicU8::new(Lifecycle::NotStarted as u8),
                commands,
                receiver: Mutex::new(Some(receiver)),
            }),
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.shared.lifecycle.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle() == Lifecycle::Running
    }

    /// Broadcasts a message to every connected page.
    ///
    /// Callable from any thread or runtime. Returns as soon as the message
    /// is queued. Before start and after stop the message is dropped with a
    /// warning.
    pub fn broadcast_from_anywhere(&self, message: HubMessage) -> Dispatch {
        let kind = message.kind();
        let dispatch = self.send(HubCommand::Broadcast(message));
        if dispatch == Dispatch::NotRunning {
            warn!(kind, lifecycle = ?self.lifecycle(), "Hub not running, message dropped");
        }
        dispatch
    }

    /// Replaces the current article and broadcasts it.
    pub fn set_article(&self, article: CurrentArticle) -> Dispatch {
        let dispatch = self.send(HubCommand::SetArticle(article));
        if dispatch == Dispatch::NotRunning {
            warn!(lifecycle = ?self.lifecycle(), "Hub not running, article dropped");
        }
        dispatch
    }

    /// Number of open connections.
    pub async fn peer_count(&self) -> SyncResult<usize> {
        let (tx, rx) = oneshot::channel();
        if self.send(HubCommand::PeerCount(tx)) == Dispatch::NotRunning {
            return Err(SyncError::NotRunning);
        }
        rx.await.map_err(|_| SyncError::NotRunning)
    }

    /// The last article set, if any.
    pub async fn current_article(&self) -> SyncResult<Option<CurrentArticle>> {
        let (tx, rx) = oneshot::channel();
        if self.send(HubCommand::Snapshot(tx)) == Dispatch::NotRunning {
            return Err(SyncError::NotRunning);
        }
        rx.await.map_err(|_| SyncError::NotRunning)
    }

    /// Queues a command if the hub is running.
    pub(crate) fn send(&self, command: HubCommand) -> Dispatch {
        if !self.is_running() {
            return Dispatch::NotRunning;
        }
        match self.shared.commands.send(command) {
            Ok(()) => Dispatch::Scheduled,
            Err(_) => Dispatch::NotRunning,
        }
    }

    fn set_lifecycle(&self, state: Lifecycle) {
        let previous = self.shared.lifecycle.swap(state as u8, Ordering::AcqRel);
        if previous != state as u8 {
            debug!(from = ?Lifecycle::from_u8(previous), to = ?state, "Hub lifecycle changed");
        }
    }

    fn take_receiver(&self) -> SyncResult<UnboundedReceiver<HubCommand>> {
        self.shared
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SyncError::AlreadyStarted)
    }

    /// Bypasses the lifecycle gate. Used for teardown.
    fn send_raw(&self, command: HubCommand) {
        let _ = self.shared.commands.send(command);
    }
}

// =============================================================================
// Hub Server
// =============================================================================

/// Shared state for connection handlers.
struct HubContext {
    handle: HubHandle,
    inbound: InboundHandler,
    frame_limit: usize,
}

/// The hub server. Consumed by [`HubServer::start`].
pub struct HubServer {
    config: HubConfig,
    handle: HubHandle,
    inbound: InboundHandler,
}

/// A started hub. Dropping it stops the server.
pub struct RunningHub {
    local_addr: SocketAddr,
    handle: HubHandle,
    shutdown_tx: oneshot::Sender<()>,
    done_rx: oneshot::Receiver<()>,
}

impl RunningHub {
    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> &HubHandle {
        &self.handle
    }

    /// Stops accepting work, closes the listener and waits for the hub
    /// thread to finish.
    pub async fn stop(self) {
        let RunningHub {
            handle,
            shutdown_tx,
            done_rx,
            ..
        } = self;
        handle.set_lifecycle(Lifecycle::Stopped);
        let _ = shutdown_tx.send(());
        let _ = done_rx.await;
    }
}

impl HubServer {
    pub fn new(config: HubConfig, handle: HubHandle, inbound: InboundHandler) -> Self {
        HubServer {
            config,
            handle,
            inbound,
        }
    }

    /// Spawns the hub thread and waits until the listener is bound.
    pub async fn start(self) -> SyncResult<RunningHub> {
        let HubServer {
            config,
            handle,
            inbound,
        } = self;

        let commands = handle.take_receiver()?;
        let (ready_tx, ready_rx) = oneshot::channel::<SyncResult<SocketAddr>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        let thread_handle = handle.clone();
        std::thread::Builder::new()
            .name("tagger-hub".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        thread_handle.set_lifecycle(Lifecycle::Stopped);
                        let _ = ready_tx.send(Err(SyncError::RuntimeFailed(e.to_string())));
                        return;
                    }
                };
                runtime.block_on(serve(config, thread_handle, inbound, commands, ready_tx, shutdown_rx));
                let _ = done_tx.send(());
            })?;

        let local_addr = ready_rx
            .await
            .map_err(|_| SyncError::RuntimeFailed("hub thread exited during startup".into()))??;

        Ok(RunningHub {
            local_addr,
            handle,
            shutdown_tx,
            done_rx,
        })
    }
}

/// Body of the hub thread.
async fn serve(
    config: HubConfig,
    handle: HubHandle,
    inbound: InboundHandler,
    commands: UnboundedReceiver<HubCommand>,
    ready_tx: oneshot::Sender<SyncResult<SocketAddr>>,
    shutdown_rx: oneshot::Receiver<()>,
) {
    let bind_addr = config.bind_address();
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %bind_addr, error = %e, "Hub failed to bind");
            handle.set_lifecycle(Lifecycle::Stopped);
            let _ = ready_tx.send(Err(SyncError::BindFailed {
                addr: bind_addr,
                reason: e.to_string(),
            }));
            return;
        }
    };
    let local_addr = match listener.local_addr() {
        Ok(addr) => addr,
        Err(e) => {
            handle.set_lifecycle(Lifecycle::Stopped);
            let _ = ready_tx.send(Err(e.into()));
            return;
        }
    };

    let dispatcher = tokio::spawn(run_dispatcher(commands));

    let context = Arc::new(HubContext {
        handle: handle.clone(),
        inbound,
        frame_limit: config.frame_limit(),
    });
    let app = Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(context);

    handle.set_lifecycle(Lifecycle::Running);
    info!(addr = %local_addr, "Hub server started");
    let _ = ready_tx.send(Ok(local_addr));

    let result = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
            info!("Hub server shutting down");
        })
        .await;
    if let Err(e) = result {
        error!(error = %e, "Hub server failed");
    }

    handle.set_lifecycle(Lifecycle::Stopped);
    handle.send_raw(HubCommand::Shutdown);
    let _ = dispatcher.await;
    info!("Hub server stopped");
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Owns the peer set and the snapshot. Runs until `Shutdown` or until every
/// handle is gone.
async fn run_dispatcher(mut commands: UnboundedReceiver<HubCommand>) {
    let mut peers = PeerRegistry::new();
    let mut current: Option<CurrentArticle> = None;

    while let Some(command) = commands.recv().await {
        match command {
            HubCommand::Join(peer) => peers.join(peer.id, peer.sender()),
            HubCommand::Leave(id) => peers.leave(&id),
            HubCommand::Broadcast(message) => {
                let report = peers.broadcast(&message);
                debug!(
                    kind = message.kind(),
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "Broadcast"
                );
            }
            HubCommand::SetArticle(article) => {
                debug!(ean = %article.ean, "Current article set");
                current = Some(article.clone());
                peers.broadcast(&HubMessage::CurrentArticle(article));
            }
            HubCommand::SendSnapshot(id) => match &current {
                Some(article) => {
                    peers.send_to(&id, &HubMessage::CurrentArticle(article.clone()));
                }
                None => debug!(peer = %id, "No current article yet"),
            },
            HubCommand::PeerCount(reply) => {
                let _ = reply.send(peers.len());
            }
            HubCommand::Snapshot(reply) => {
                let _ = reply.send(current.clone());
            }
            HubCommand::Shutdown => break,
        }
    }

    debug!(peers = peers.len(), "Dispatcher stopped");
}

// =============================================================================
// WebSocket Handler
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    "OK"
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(context): State<Arc<HubContext>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> impl IntoResponse {
    ws.max_message_size(context.frame_limit)
        .max_frame_size(context.frame_limit)
        .on_upgrade(move |socket| handle_socket(socket, context, addr))
}

/// Handles one page connection until it closes.
async fn handle_socket(socket: WebSocket, context: Arc<HubContext>, addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let peer = PeerContext::new(Uuid::new_v4(), tx);

    if context.handle.send(HubCommand::Join(peer.clone())) == Dispatch::NotRunning {
        debug!(addr = %addr, "Hub stopping, connection refused");
        return;
    }
    info!(peer = %peer.id, addr = %addr, "Page connected");

    // Writer: drains the peer queue and keeps the connection alive
    let writer = tokio::spawn(async move {
        let mut ping = interval(PING_INTERVAL);
        ping.tick().await;
        loop {
            tokio::select! {
                outgoing = rx.recv() => {
                    let Some(json) = outgoing else { break };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if sender.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sender.close().await;
    });

    // Reader: one frame at a time, each handled to completion
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    debug!(peer = %peer.id, "Ignoring non-UTF-8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(peer = %peer.id, error = %e, "WebSocket error");
                break;
            }
        };
        context.inbound.handle(&peer, &text).await;
    }

    context.handle.send_raw(HubCommand::Leave(peer.id));
    writer.abort();
    info!(peer = %peer.id, addr = %addr, "Page disconnected");
}
