//! Pull-channel seam: the REST surface the client consumes.
//!
//! Everything that is not pushed over the socket — the authoritative
//! re-fetches, one-shot mutations, and secondary lookups — goes through the
//! [`GameApi`] trait. The default implementation is
//! [`HttpApi`](crate::http::HttpApi) (behind the `http-api` feature);
//! tests substitute scripted mocks the same way the socket side substitutes
//! a mock [`Transport`](crate::Transport).

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{
    Game, GameId, GuessOutcome, GuessRequest, PlayerStats, Room, RoomId, RoundRecord,
};

/// The REST operations the session layer depends on.
///
/// All methods are one-shot request/reply; none of them retries. Error
/// mapping is the implementor's job: 404 ⇒
/// [`FlagFrenzyError::NotFound`](crate::FlagFrenzyError::NotFound), 401 ⇒
/// credential invalidation plus
/// [`FlagFrenzyError::SessionExpired`](crate::FlagFrenzyError::SessionExpired).
#[async_trait]
pub trait GameApi: Send + Sync + 'static {
    /// Create a room with the caller as host.
    async fn create_room(&self) -> Result<Room>;

    /// Fetch the authoritative snapshot of a room.
    async fn fetch_room(&self, room_id: RoomId) -> Result<Room>;

    /// Leave/close the caller's current room through the normal pipeline.
    async fn cancel_room(&self) -> Result<()>;

    /// Invite a friend (by game name) into the caller's current room.
    async fn invite_friend(&self, friend_user_name: &str) -> Result<()>;

    /// Host-only: change the room's round count.
    async fn update_rounds(&self, room_id: RoomId, number_of_rounds: u32) -> Result<Room>;

    /// Start a game in the given room.
    async fn start_game(&self, room_id: RoomId) -> Result<Game>;

    /// Fetch a game by its id (the polling fallback's request).
    async fn fetch_game(&self, game_id: GameId) -> Result<Game>;

    /// Fetch the active game of a room, if one exists.
    async fn fetch_game_by_room(&self, room_id: RoomId) -> Result<Game>;

    /// Submit a guess for the current round.
    async fn submit_guess(&self, request: &GuessRequest) -> Result<GuessOutcome>;

    /// Fetch the round-by-round history of a finished game.
    async fn fetch_round_history(&self, game_id: GameId) -> Result<Vec<RoundRecord>>;

    /// Fetch aggregate statistics for one player.
    async fn fetch_player_stats(&self, user_name: &str) -> Result<PlayerStats>;
}
