//! Persistent, authenticated, auto-reconnecting broker connection.
//!
//! [`ConnectionManager`] owns a background socket loop task that dials the
//! broker, replays every topic subscription on each (re)entry to the
//! connected state, decodes inbound frames once, and publishes them on the
//! shared [`EventBus`]. Connectivity is ambient background state: nothing
//! here is awaited by UI code, and transport failures recover themselves
//! through a fixed-delay reconnect rather than surfacing to callers.
//!
//! # Example
//!
//! ```rust,ignore
//! let bus = Arc::new(EventBus::new());
//! let dialer = Arc::new(WebSocketDialer::new("wss://play.flagfrenzy.io/ws-native"));
//! let manager = ConnectionManager::new(dialer, credentials, Arc::clone(&bus));
//!
//! manager.connect(); // no-op when logged out or already connected
//! let mut room_updates = bus.subscribe(Topic::RoomUpdates);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::bus::EventBus;
use crate::credentials::CredentialProvider;
use crate::error::Result;
use crate::protocol::{ClientFrame, ServerEvent, Topic};
use crate::transport::Transport;

/// Fixed delay between reconnect attempts.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Timeout for the graceful disconnect before the loop task is aborted.
const DEFAULT_DISCONNECT_TIMEOUT: Duration = Duration::from_secs(1);

// ── Dialer ──────────────────────────────────────────────────────────

/// Establishes a fresh authenticated [`Transport`] to the broker.
///
/// The manager re-dials after every drop, re-reading the credential each
/// time, so the dialer must be reusable.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    /// Dial the broker, authenticating with the given bearer token.
    async fn dial(&self, token: &str) -> Result<Box<dyn Transport>>;
}

// ── Manager ─────────────────────────────────────────────────────────

struct ConnHandle {
    task: tokio::task::JoinHandle<()>,
    shutdown: oneshot::Sender<()>,
}

/// Owns the broker socket and its reconnect lifecycle.
pub struct ConnectionManager {
    dialer: Arc<dyn Dialer>,
    credentials: Arc<dyn CredentialProvider>,
    bus: Arc<EventBus>,
    reconnect_delay: Duration,
    connected: Arc<AtomicBool>,
    handle: Mutex<Option<ConnHandle>>,
}

impl ConnectionManager {
    /// Create a manager with the default 5 s reconnect delay.
    ///
    /// No connection is attempted until [`connect`](Self::connect).
    pub fn new(
        dialer: Arc<dyn Dialer>,
        credentials: Arc<dyn CredentialProvider>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            dialer,
            credentials,
            bus,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            connected: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Override the fixed reconnect delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Start the background socket loop.
    ///
    /// Idempotent: a no-op while a loop is already running. A missing
    /// credential is also a no-op — a logged-out client simply has no
    /// real-time channel; nothing is thrown or surfaced.
    pub fn connect(&self) {
        let Ok(mut slot) = self.handle.lock() else {
            return;
        };
        if let Some(handle) = slot.as_ref() {
            if !handle.task.is_finished() {
                debug!("connect: socket loop already running");
                return;
            }
        }

        let Some(token) = self.credentials.token() else {
            debug!("connect: no credential, skipping broker connection");
            return;
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(socket_loop(
            Arc::clone(&self.dialer),
            Arc::clone(&self.credentials),
            Arc::clone(&self.bus),
            Arc::clone(&self.connected),
            self.reconnect_delay,
            token,
            shutdown_rx,
        ));
        *slot = Some(ConnHandle {
            task,
            shutdown: shutdown_tx,
        });
    }

    /// Tear down every topic subscription, then the transport.
    ///
    /// Safe to call when never connected. The loop is given a short grace
    /// period to unsubscribe and close; after that it is aborted.
    pub async fn disconnect(&self) {
        let taken = match self.handle.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(handle) = taken else {
            debug!("disconnect: no socket loop to stop");
            return;
        };

        let _ = handle.shutdown.send(());
        let mut task = handle.task;
        match tokio::time::timeout(DEFAULT_DISCONNECT_TIMEOUT, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("socket loop terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("socket loop did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("socket loop aborted: {join_err}");
                }
            }
        }
        self.connected.store(false, Ordering::Release);
    }

    /// Returns `true` while the broker socket is believed to be up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connected", &self.is_connected())
            .field("reconnect_delay", &self.reconnect_delay)
            .finish()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // `Drop` is synchronous so the graceful path (async unsubscribe +
        // close) cannot run here; aborting the task drops the loop future
        // immediately.
        if let Ok(mut slot) = self.handle.lock() {
            if let Some(handle) = slot.take() {
                handle.task.abort();
            }
        }
    }
}

// ── Socket loop ─────────────────────────────────────────────────────

/// Why one connected session ended.
enum SessionExit {
    /// `disconnect()` was requested; the loop must not reconnect.
    Shutdown,
    /// The transport dropped or errored; the loop reconnects after the
    /// fixed delay.
    Dropped,
}

/// Background loop: dial, resubscribe, pump frames, reconnect on drop.
///
/// Exits when `disconnect()` fires the shutdown signal, or when the
/// credential disappears between attempts (logout while reconnecting).
async fn socket_loop(
    dialer: Arc<dyn Dialer>,
    credentials: Arc<dyn CredentialProvider>,
    bus: Arc<EventBus>,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
    mut token: String,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("socket loop started");

    loop {
        match dialer.dial(&token).await {
            Ok(mut transport) => {
                connected.store(true, Ordering::Release);

                // Subscriptions are restored on every entry to the
                // connected state, not just the first.
                let exit = match subscribe_all(transport.as_mut()).await {
                    Ok(()) => pump_frames(transport.as_mut(), &bus, &mut shutdown_rx).await,
                    Err(e) => {
                        error!("failed to restore subscriptions: {e}");
                        SessionExit::Dropped
                    }
                };
                connected.store(false, Ordering::Release);

                if let SessionExit::Shutdown = exit {
                    unsubscribe_all(transport.as_mut()).await;
                    let _ = transport.close().await;
                    break;
                }
            }
            Err(e) => {
                warn!("broker dial failed: {e}");
            }
        }

        // Fixed backoff, interruptible by disconnect.
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("shutdown during reconnect wait");
                break;
            }
            _ = tokio::time::sleep(reconnect_delay) => {}
        }

        // Re-read the credential in case it rotated; a logged-out client
        // stops reconnecting.
        match credentials.token() {
            Some(fresh) => token = fresh,
            None => {
                debug!("credential gone, stopping reconnect loop");
                break;
            }
        }
    }

    debug!("socket loop exited");
}

/// Pump inbound frames into the bus until shutdown or transport drop.
async fn pump_frames(
    transport: &mut dyn Transport,
    bus: &EventBus,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> SessionExit {
    loop {
        tokio::select! {
            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return SessionExit::Shutdown;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        // Decode once; fan-out happens inside the bus. A
                        // single malformed frame must not break the channel.
                        match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => bus.publish(event),
                            Err(e) => {
                                warn!("failed to decode pushed frame: {e} — raw: {text}");
                            }
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return SessionExit::Dropped;
                    }
                    None => {
                        debug!("broker closed the connection");
                        return SessionExit::Dropped;
                    }
                }
            }
        }
    }
}

/// Send one subscribe frame per topic.
async fn subscribe_all(transport: &mut dyn Transport) -> Result<()> {
    for topic in Topic::ALL {
        let frame = serde_json::to_string(&ClientFrame::Subscribe { topic })?;
        transport.send(frame).await?;
        debug!(queue = topic.queue(), "subscribed");
    }
    Ok(())
}

/// Best-effort unsubscribe for the graceful disconnect path.
async fn unsubscribe_all(transport: &mut dyn Transport) {
    for topic in Topic::ALL {
        let Ok(frame) = serde_json::to_string(&ClientFrame::Unsubscribe { topic }) else {
            continue;
        };
        if transport.send(frame).await.is_err() {
            // The transport is going away regardless.
            return;
        }
    }
}
