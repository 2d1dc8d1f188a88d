//! Wire-compatible protocol types for the Flag Frenzy game server.
//!
//! Every type in this module produces identical JSON to the server's REST
//! DTOs and broker frames. Field names follow the server's camelCase
//! convention via `#[serde(rename_all = "camelCase")]`; enum constants use
//! the server's SCREAMING_SNAKE_CASE.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Type aliases ────────────────────────────────────────────────────

/// Unique identifier for rooms.
pub type RoomId = Uuid;

/// Unique identifier for games.
pub type GameId = Uuid;

// ── Topics ──────────────────────────────────────────────────────────

/// The fixed set of server-pushed topics, one per-user queue each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Invites,
    RoomUpdates,
    RoomClosed,
    GameStarted,
    RoundStarted,
    GameEnded,
    FriendRequest,
    FriendResponse,
    FriendRemoved,
}

impl Topic {
    /// All topics, in subscription order.
    pub const ALL: [Topic; 9] = [
        Topic::Invites,
        Topic::RoomUpdates,
        Topic::RoomClosed,
        Topic::GameStarted,
        Topic::RoundStarted,
        Topic::GameEnded,
        Topic::FriendRequest,
        Topic::FriendResponse,
        Topic::FriendRemoved,
    ];

    /// The broker queue path for this topic.
    pub fn queue(self) -> &'static str {
        match self {
            Topic::Invites => "/user/queue/invites",
            Topic::RoomUpdates => "/user/queue/room-updates",
            Topic::RoomClosed => "/user/queue/room-closed",
            Topic::GameStarted => "/user/queue/game-started",
            Topic::RoundStarted => "/user/queue/round-started",
            Topic::GameEnded => "/user/queue/game-ended",
            Topic::FriendRequest => "/user/queue/friend-request",
            Topic::FriendResponse => "/user/queue/friend-response",
            Topic::FriendRemoved => "/user/queue/friend-removed",
        }
    }
}

// ── Enums ───────────────────────────────────────────────────────────

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// Waiting for a guest to join.
    Open,
    /// A game is running in this room.
    InGame,
    /// The room has been closed by the host or the server.
    Closed,
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    InProgress,
    Completed,
}

// ── Entities ────────────────────────────────────────────────────────

/// A lobby pairing a host and an optional guest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub status: RoomStatus,
    pub number_of_rounds: u32,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// One scored playthrough of a fixed round count within a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub room_id: RoomId,
    pub host_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_name: Option<String>,
    pub host_score: u32,
    /// Absent in single-player games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_score: Option<u32>,
    pub total_rounds: u32,
    pub current_round: u32,
    pub status: GameStatus,
    /// Absent once the game has completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_round_data: Option<RoundData>,
}

impl Game {
    /// Server-reported remaining seconds for the current round, if any.
    pub fn time_remaining(&self) -> Option<u32> {
        self.current_round_data.as_ref().map(|r| r.time_remaining)
    }

    /// Whether this is the last round of the game.
    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.total_rounds
    }
}

/// The active round within a [`Game`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundData {
    pub round_number: u32,
    /// Identifier of the country whose flag is displayed.
    pub country_id: String,
    /// Server-enforced remaining time, in whole seconds.
    pub time_remaining: u32,
    pub round_active: bool,
}

// ── Pushed event payloads ───────────────────────────────────────────

/// Payload for the `invites` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvitePayload {
    pub initiator_user_name: String,
    pub target_user_name: String,
    pub room_id: RoomId,
}

/// Payload for the `room-closed` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomClosedPayload {
    pub room_id: RoomId,
    pub message: String,
}

/// Payload for the `friend-request` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestPayload {
    pub from_user_name: String,
}

/// Payload for the `friend-response` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendResponsePayload {
    pub from_user_name: String,
    pub accepted: bool,
}

/// Payload for the `friend-removed` topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRemovedPayload {
    pub user_name: String,
}

// ── Messages ────────────────────────────────────────────────────────

/// Frames sent from the client to the event broker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum ClientFrame {
    /// Subscribe to one pushed topic. Sent once per topic on every
    /// (re)entry to the connected state.
    Subscribe { topic: Topic },
    /// Drop one topic subscription. Sent during graceful disconnect.
    Unsubscribe { topic: Topic },
}

/// Server-pushed events, tagged by originating topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "topic", content = "data")]
pub enum ServerEvent {
    /// A friend invited this user into a room.
    #[serde(rename = "invites")]
    Invite(InvitePayload),
    /// Authoritative room snapshot (boxed payloads keep the enum small).
    #[serde(rename = "room-updates")]
    RoomUpdate(Box<Room>),
    /// The room was closed by the host or the server.
    #[serde(rename = "room-closed")]
    RoomClosed(RoomClosedPayload),
    /// A game started in a room this user belongs to.
    #[serde(rename = "game-started")]
    GameStarted(Box<Game>),
    /// A new round began; payload is the full updated game.
    #[serde(rename = "round-started")]
    RoundStarted(Box<Game>),
    /// The game finished; payload is the final game.
    #[serde(rename = "game-ended")]
    GameEnded(Box<Game>),
    #[serde(rename = "friend-request")]
    FriendRequest(FriendRequestPayload),
    #[serde(rename = "friend-response")]
    FriendResponse(FriendResponsePayload),
    #[serde(rename = "friend-removed")]
    FriendRemoved(FriendRemovedPayload),
}

impl ServerEvent {
    /// The topic this event was pushed on.
    pub fn topic(&self) -> Topic {
        match self {
            ServerEvent::Invite(_) => Topic::Invites,
            ServerEvent::RoomUpdate(_) => Topic::RoomUpdates,
            ServerEvent::RoomClosed(_) => Topic::RoomClosed,
            ServerEvent::GameStarted(_) => Topic::GameStarted,
            ServerEvent::RoundStarted(_) => Topic::RoundStarted,
            ServerEvent::GameEnded(_) => Topic::GameEnded,
            ServerEvent::FriendRequest(_) => Topic::FriendRequest,
            ServerEvent::FriendResponse(_) => Topic::FriendResponse,
            ServerEvent::FriendRemoved(_) => Topic::FriendRemoved,
        }
    }

    /// The room this event concerns, when the payload carries one.
    /// Used for room-scoped handler dispatch.
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            ServerEvent::Invite(p) => Some(p.room_id),
            ServerEvent::RoomUpdate(room) => Some(room.id),
            ServerEvent::RoomClosed(p) => Some(p.room_id),
            ServerEvent::GameStarted(game)
            | ServerEvent::RoundStarted(game)
            | ServerEvent::GameEnded(game) => Some(game.room_id),
            ServerEvent::FriendRequest(_)
            | ServerEvent::FriendResponse(_)
            | ServerEvent::FriendRemoved(_) => None,
        }
    }
}

// ── HTTP request/response DTOs ──────────────────────────────────────

/// Request body for starting a game in a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartGameRequest {
    pub room_id: RoomId,
}

/// Request body for the host editing the room's round count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoundsRequest {
    pub room_id: RoomId,
    pub number_of_rounds: u32,
}

/// Request body for inviting a friend into the current room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub friend_user_name: String,
}

/// Request body for submitting a guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuessRequest {
    pub game_id: GameId,
    pub round_number: u32,
    pub guess_text: String,
}

/// Response to a submitted guess: the authoritative post-guess game plus
/// the verdict for this guess.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuessOutcome {
    pub game: Game,
    pub correct: bool,
    pub points_awarded: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Request body for the per-player statistics lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsRequest {
    pub user_name: String,
}

/// Aggregate statistics for one player.
///
/// The statistics endpoint omits `userName` in its response; callers fill
/// it in. All aggregate fields are optional so a degraded placeholder can
/// carry only the name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    #[serde(default)]
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games_won: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_time_secs: Option<f64>,
}

impl PlayerStats {
    /// A placeholder carrying only the player's name, used when the
    /// statistics fetch fails.
    pub fn placeholder(user_name: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            ..Self::default()
        }
    }
}

/// One recorded guess within a completed round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GuessRecord {
    pub user_name: String,
    pub guessed_country_name: String,
    pub correct: bool,
}

/// One completed round in a game's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub round_number: u32,
    pub country_id: String,
    /// Revealed after the round ends.
    pub country_name: String,
    #[serde(default)]
    pub guesses: Vec<GuessRecord>,
}
