//! Room state reconciliation.
//!
//! Exactly one authoritative [`Room`] exists client-side per room id, and
//! the [`RoomWatcher`] is its sole writer. Snapshots arrive from two
//! channels that guarantee nothing about relative ordering — pushed
//! `room-updates` events and HTTP re-fetches — so every incoming snapshot
//! passes through the pure [`merge_room`] reducer, which decides by logical
//! comparison (room id, guest presence) rather than arrival order.
//!
//! The one anti-regression rule: a room that already has a guest must never
//! lose it to an older no-guest snapshot (a stale pre-join fetch racing a
//! join push). All other fields are last-write-wins; genuine transitions
//! (status changes, round-count edits) are monotonic enough not to need a
//! field-level merge.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::GameApi;
use crate::bus::EventBus;
use crate::error::{FlagFrenzyError, Result};
use crate::protocol::{PlayerStats, Room, RoomId, ServerEvent, Topic};

// ── Merge reducer ───────────────────────────────────────────────────

/// Merge an incoming snapshot into the current room state.
///
/// Returns the next state, or `None` when the incoming snapshot must be
/// ignored. Pure; both push updates and fetch results go through here.
pub fn merge_room(room_id: RoomId, current: Option<&Room>, incoming: Room) -> Option<Room> {
    if incoming.id != room_id {
        return None;
    }
    let Some(current) = current else {
        return Some(incoming);
    };
    // Anti-regression guard: a stale pre-join snapshot racing a join push
    // must not erase the guest.
    if current.guest_name.is_some() && incoming.guest_name.is_none() {
        debug!("ignoring stale guestless snapshot for room {room_id}");
        return None;
    }
    Some(incoming)
}

// ── Host flag persistence ───────────────────────────────────────────

/// Per-room "this client is the host" flags.
///
/// Written when a player creates a room, read at view entry, cleared on
/// leaving.
#[derive(Debug, Default)]
pub struct HostFlags {
    flags: Mutex<HashMap<RoomId, bool>>,
}

impl HostFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record whether this client hosts the given room.
    pub fn set_host(&self, room_id: RoomId, is_host: bool) {
        if let Ok(mut flags) = self.flags.lock() {
            flags.insert(room_id, is_host);
        }
    }

    /// Whether this client hosts the given room. Unknown rooms are `false`.
    pub fn is_host(&self, room_id: RoomId) -> bool {
        self.flags
            .lock()
            .ok()
            .and_then(|flags| flags.get(&room_id).copied())
            .unwrap_or(false)
    }

    /// Forget the flag for a room (on leave).
    pub fn clear(&self, room_id: RoomId) {
        if let Ok(mut flags) = self.flags.lock() {
            flags.remove(&room_id);
        }
    }
}

// ── View ────────────────────────────────────────────────────────────

/// Snapshot of everything a room view renders.
#[derive(Debug, Clone, Default)]
pub struct RoomView {
    /// The authoritative room, once loaded.
    pub room: Option<Room>,
    /// Host statistics; a name-only placeholder when the lookup failed.
    pub host_stats: Option<PlayerStats>,
    /// Guest statistics; `None` while the room has no guest.
    pub guest_stats: Option<PlayerStats>,
    /// Whether this client hosts the room.
    pub is_host: bool,
    /// Set when the server closed the room.
    pub closed_message: Option<String>,
    /// Transient user-facing message (load/invite failures etc.).
    pub notice: Option<String>,
}

// ── Watcher ─────────────────────────────────────────────────────────

struct RoomWatcherInner {
    api: Arc<dyn GameApi>,
    bus: Arc<EventBus>,
    host_flags: Arc<HostFlags>,
    room_id: RoomId,
    state: Mutex<RoomView>,
    view_tx: watch::Sender<RoomView>,
    listener: Mutex<Option<tokio::task::JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Maintains the single authoritative room view for one room.
///
/// On construction it immediately consumes the bus's last-value slot (a
/// push that arrived before this view existed is not lost) and then
/// listens live on `room-updates` and `room-closed`. Call
/// [`load`](Self::load) to feed in the initial HTTP snapshot.
pub struct RoomWatcher {
    inner: Arc<RoomWatcherInner>,
}

impl RoomWatcher {
    /// Create a watcher for `room_id` and start its push listener.
    pub fn new(
        api: Arc<dyn GameApi>,
        bus: Arc<EventBus>,
        host_flags: Arc<HostFlags>,
        room_id: RoomId,
    ) -> Self {
        let is_host = host_flags.is_host(room_id);
        let view = RoomView {
            is_host,
            ..RoomView::default()
        };
        let (view_tx, _view_rx) = watch::channel(view.clone());
        let inner = Arc::new(RoomWatcherInner {
            api,
            bus,
            host_flags,
            room_id,
            state: Mutex::new(view),
            view_tx,
            listener: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let task = tokio::spawn(listen(Arc::clone(&inner)));
        if let Ok(mut slot) = inner.listener.lock() {
            *slot = Some(task);
        }

        Self { inner }
    }

    /// Create a fresh room with this client as host and return a watcher
    /// bound to it.
    ///
    /// Records the host flag so a later view entry for the same room knows
    /// this client hosts it.
    pub async fn create(
        api: Arc<dyn GameApi>,
        bus: Arc<EventBus>,
        host_flags: Arc<HostFlags>,
    ) -> Result<Self> {
        let room = api.create_room().await?;
        host_flags.set_host(room.id, true);
        let watcher = Self::new(api, bus, host_flags, room.id);
        apply_snapshot(&watcher.inner, room);
        Ok(watcher)
    }

    /// The room this watcher is bound to.
    pub fn room_id(&self) -> RoomId {
        self.inner.room_id
    }

    /// Subscribe to view snapshots (last-value semantics).
    pub fn watch(&self) -> watch::Receiver<RoomView> {
        self.inner.view_tx.subscribe()
    }

    /// The current view snapshot.
    pub fn view(&self) -> RoomView {
        self.inner
            .state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Fetch the authoritative snapshot over HTTP and merge it.
    ///
    /// The result goes through the same [`merge_room`] path as push
    /// updates, so a response that raced a newer push is discarded.
    ///
    /// # Errors
    ///
    /// Fetch failures surface a user-facing notice on the view and return
    /// the underlying error; [`FlagFrenzyError::SessionExpired`] means the
    /// credential was already invalidated.
    pub async fn load(&self) -> Result<()> {
        match self.inner.api.fetch_room(self.inner.room_id).await {
            Ok(room) => {
                apply_snapshot(&self.inner, room);
                Ok(())
            }
            Err(e) => {
                let notice = match &e {
                    FlagFrenzyError::NotFound => "Room not found.",
                    FlagFrenzyError::SessionExpired => "Session expired. Please login again.",
                    _ => "Failed to load room. Please try again.",
                };
                set_notice(&self.inner, Some(notice.to_string()));
                Err(e)
            }
        }
    }

    /// Invite a friend (by game name) into this room.
    ///
    /// The outcome, success or failure, is surfaced as a transient notice;
    /// errors are fully recoverable and mutate no room state.
    pub async fn invite(&self, friend_user_name: &str) -> Result<()> {
        let friend = friend_user_name.trim();
        if friend.is_empty() {
            set_notice(
                &self.inner,
                Some("Please enter a friend's game name".to_string()),
            );
            return Ok(());
        }
        match self.inner.api.invite_friend(friend).await {
            Ok(()) => {
                set_notice(&self.inner, Some(format!("Invitation sent to {friend}!")));
                Ok(())
            }
            Err(e) => {
                set_notice(
                    &self.inner,
                    Some("Failed to send invitation. Please try again.".to_string()),
                );
                Err(e)
            }
        }
    }

    /// Host-only: change the room's round count. The updated room feeds
    /// through the normal merge path.
    pub async fn update_rounds(&self, number_of_rounds: u32) -> Result<()> {
        let room = self
            .inner
            .api
            .update_rounds(self.inner.room_id, number_of_rounds)
            .await?;
        apply_snapshot(&self.inner, room);
        Ok(())
    }

    /// Leave the room through the normal request pipeline and forget the
    /// host flag.
    pub async fn leave(&self) -> Result<()> {
        let result = self.inner.api.cancel_room().await;
        self.inner.host_flags.clear(self.inner.room_id);
        result
    }

    /// Stop the push listener. Idempotent; also runs on drop.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut slot) = self.inner.listener.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}

impl Drop for RoomWatcher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RoomWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomWatcher")
            .field("room_id", &self.inner.room_id)
            .finish_non_exhaustive()
    }
}

// ── Internals ───────────────────────────────────────────────────────

/// Push listener: catch up from the last-value slots, then consume live
/// `room-updates` and `room-closed` events.
async fn listen(inner: Arc<RoomWatcherInner>) {
    let mut updates = inner.bus.subscribe(Topic::RoomUpdates);
    let mut closed = inner.bus.subscribe(Topic::RoomClosed);

    // A push that arrived before this view was constructed is still
    // observable through the last-value slots.
    if let Some(ServerEvent::RoomUpdate(room)) = inner.bus.latest(Topic::RoomUpdates) {
        apply_snapshot(&inner, *room);
    }
    if let Some(ServerEvent::RoomClosed(payload)) = inner.bus.latest(Topic::RoomClosed) {
        if payload.room_id == inner.room_id {
            mark_closed(&inner, payload.message);
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(ServerEvent::RoomUpdate(room)) => apply_snapshot(&inner, *room),
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    // Only the newest snapshot matters; the next event (or
                    // the polling fetch) re-converges.
                    warn!("room-updates subscriber lagged, skipped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            event = closed.recv() => match event {
                Ok(ServerEvent::RoomClosed(payload)) if payload.room_id == inner.room_id => {
                    mark_closed(&inner, payload.message);
                    break;
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("room-closed subscriber lagged, skipped {skipped} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Run one snapshot through the reducer and, when accepted, kick off the
/// secondary statistics refresh.
fn apply_snapshot(inner: &Arc<RoomWatcherInner>, incoming: Room) {
    let accepted = {
        let Ok(mut state) = inner.state.lock() else {
            return;
        };
        match merge_room(inner.room_id, state.room.as_ref(), incoming) {
            Some(next) => {
                let names = (next.host_name.clone(), next.guest_name.clone());
                state.room = Some(next);
                inner.view_tx.send_replace(state.clone());
                Some(names)
            }
            None => None,
        }
    };

    if let Some((host_name, guest_name)) = accepted {
        if !inner.closed.load(Ordering::Acquire) {
            tokio::spawn(refresh_stats(
                Arc::clone(inner),
                host_name,
                guest_name,
            ));
        }
    }
}

/// Secondary per-player statistics fetch. Failure degrades to a name-only
/// placeholder; it never fails the room update that triggered it.
async fn refresh_stats(inner: Arc<RoomWatcherInner>, host_name: String, guest_name: Option<String>) {
    let host_stats = fetch_stats_or_placeholder(inner.api.as_ref(), &host_name).await;
    let guest_stats = match &guest_name {
        Some(name) => Some(fetch_stats_or_placeholder(inner.api.as_ref(), name).await),
        None => None,
    };

    let Ok(mut state) = inner.state.lock() else {
        return;
    };
    // The room may have moved on (guest left) while the fetch was in
    // flight; only keep stats for players still present.
    let current_guest = state.room.as_ref().and_then(|r| r.guest_name.clone());
    state.host_stats = Some(host_stats);
    state.guest_stats = if current_guest == guest_name {
        guest_stats
    } else {
        None
    };
    inner.view_tx.send_replace(state.clone());
}

async fn fetch_stats_or_placeholder(api: &dyn GameApi, user_name: &str) -> PlayerStats {
    match api.fetch_player_stats(user_name).await {
        Ok(stats) => stats,
        Err(e) => {
            debug!("player stats fetch for {user_name} failed: {e}");
            PlayerStats::placeholder(user_name)
        }
    }
}

fn mark_closed(inner: &Arc<RoomWatcherInner>, message: String) {
    let Ok(mut state) = inner.state.lock() else {
        return;
    };
    state.closed_message = Some(message);
    inner.view_tx.send_replace(state.clone());
}

fn set_notice(inner: &Arc<RoomWatcherInner>, notice: Option<String>) {
    let Ok(mut state) = inner.state.lock() else {
        return;
    };
    state.notice = notice;
    inner.view_tx.send_replace(state.clone());
}

// ── Tests ───────────────────────────────────────────────────────────
