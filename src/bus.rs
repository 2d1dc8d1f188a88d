//! Typed publish/subscribe bus for server-pushed events.
//!
//! Component lifecycles are driven by navigation, so a consumer may be
//! constructed *after* the event it needs has already arrived. The bus
//! therefore offers, per topic:
//!
//! - a **last-value query** ([`EventBus::latest`]) — a late subscriber
//!   immediately sees the most recent event instead of nothing, and
//! - a **live subscription** ([`EventBus::subscribe`]) — a broadcast
//!   channel preserving per-topic delivery order.
//!
//! Room-scoped dispatch is available through a callback registry keyed by
//! room id ([`EventBus::register_room_handler`]). Registration hands back a
//! stable [`HandlerId`]; removal is identity-based, so unregistering one
//! handler never disturbs other handlers for the same room, and removing an
//! id that was never registered is a no-op.
//!
//! The bus is an explicit object passed by reference to whichever
//! components need it — there is no ambient global registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::warn;

use crate::protocol::{RoomId, ServerEvent, Topic};

/// Default capacity of each per-topic broadcast channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Callback invoked for events scoped to a registered room id.
pub type RoomHandler = Arc<dyn Fn(&ServerEvent) + Send + Sync>;

/// Stable identity of a registered room handler, used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerId(u64);

struct TopicChannel {
    tx: broadcast::Sender<ServerEvent>,
    last: Mutex<Option<ServerEvent>>,
}

impl TopicChannel {
    fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            tx,
            last: Mutex::new(None),
        }
    }
}

/// One channel per pushed topic.
struct Channels {
    invites: TopicChannel,
    room_updates: TopicChannel,
    room_closed: TopicChannel,
    game_started: TopicChannel,
    round_started: TopicChannel,
    game_ended: TopicChannel,
    friend_request: TopicChannel,
    friend_response: TopicChannel,
    friend_removed: TopicChannel,
}

impl Channels {
    fn new(capacity: usize) -> Self {
        Self {
            invites: TopicChannel::new(capacity),
            room_updates: TopicChannel::new(capacity),
            room_closed: TopicChannel::new(capacity),
            game_started: TopicChannel::new(capacity),
            round_started: TopicChannel::new(capacity),
            game_ended: TopicChannel::new(capacity),
            friend_request: TopicChannel::new(capacity),
            friend_response: TopicChannel::new(capacity),
            friend_removed: TopicChannel::new(capacity),
        }
    }

    fn get(&self, topic: Topic) -> &TopicChannel {
        match topic {
            Topic::Invites => &self.invites,
            Topic::RoomUpdates => &self.room_updates,
            Topic::RoomClosed => &self.room_closed,
            Topic::GameStarted => &self.game_started,
            Topic::RoundStarted => &self.round_started,
            Topic::GameEnded => &self.game_ended,
            Topic::FriendRequest => &self.friend_request,
            Topic::FriendResponse => &self.friend_response,
            Topic::FriendRemoved => &self.friend_removed,
        }
    }
}

/// The event bus. One instance is shared by the connection manager (the
/// publisher) and every consumer.
pub struct EventBus {
    channels: Channels,
    rooms: Mutex<HashMap<RoomId, Vec<(HandlerId, RoomHandler)>>>,
    next_handler: AtomicU64,
}

impl EventBus {
    /// Create a bus with the default per-topic channel capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a custom per-topic channel capacity.
    /// Values below 1 are clamped to 1.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Channels::new(capacity),
            rooms: Mutex::new(HashMap::new()),
            next_handler: AtomicU64::new(0),
        }
    }

    fn channel(&self, topic: Topic) -> &TopicChannel {
        self.channels.get(topic)
    }

    /// Publish one decoded event to every delivery path.
    ///
    /// Stores it as the topic's last value, broadcasts it to live
    /// subscribers, and invokes every handler registered for the room the
    /// event concerns. Having no subscribers is not an error.
    pub fn publish(&self, event: ServerEvent) {
        let channel = self.channel(event.topic());

        if let Ok(mut last) = channel.last.lock() {
            *last = Some(event.clone());
        }

        // send() only fails when there are no receivers; the last-value
        // slot already preserved the event for them.
        let _ = channel.tx.send(event.clone());

        if let Some(room_id) = event.room_id() {
            // Clone handlers out so the registry lock is not held during
            // dispatch; handlers may re-enter register/unregister.
            let handlers: Vec<RoomHandler> = match self.rooms.lock() {
                Ok(rooms) => rooms
                    .get(&room_id)
                    .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
                    .unwrap_or_default(),
                Err(_) => Vec::new(),
            };
            for handler in handlers {
                handler(&event);
            }
        }
    }

    /// Subscribe to live events on one topic.
    ///
    /// The receiver observes events published after this call, in
    /// publication order. Pair with [`latest`](Self::latest) to also catch
    /// an event that arrived before subscribing.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<ServerEvent> {
        self.channel(topic).tx.subscribe()
    }

    /// The most recent event published on a topic, if any.
    pub fn latest(&self, topic: Topic) -> Option<ServerEvent> {
        self.channel(topic)
            .last
            .lock()
            .ok()
            .and_then(|last| last.clone())
    }

    /// Register a callback for events scoped to `room_id`.
    ///
    /// Multiple handlers per room are supported; they run in registration
    /// order. Returns the id to pass to
    /// [`unregister_room_handler`](Self::unregister_room_handler).
    pub fn register_room_handler(&self, room_id: RoomId, handler: RoomHandler) -> HandlerId {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::Relaxed));
        match self.rooms.lock() {
            Ok(mut rooms) => {
                rooms.entry(room_id).or_default().push((id, handler));
            }
            Err(_) => warn!("room handler registry poisoned, dropping registration"),
        }
        id
    }

    /// Remove one previously registered handler.
    ///
    /// Unknown ids (including ids already removed) are a no-op.
    pub fn unregister_room_handler(&self, room_id: RoomId, id: HandlerId) {
        if let Ok(mut rooms) = self.rooms.lock() {
            if let Some(entries) = rooms.get_mut(&room_id) {
                entries.retain(|(entry_id, _)| *entry_id != id);
                if entries.is_empty() {
                    rooms.remove(&room_id);
                }
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}
