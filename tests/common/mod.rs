#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Shared test utilities for Flag Frenzy client integration tests.
//!
//! Provides a channel-based [`MockTransport`] + [`MockDialer`] for the
//! socket side, a scripted [`MockApi`] for the pull channel, and helper
//! constructors for common entities.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use flag_frenzy_client::api::GameApi;
use flag_frenzy_client::connection::Dialer;
use flag_frenzy_client::error::Result;
use flag_frenzy_client::protocol::{
    Game, GameId, GameStatus, GuessOutcome, GuessRequest, PlayerStats, Room, RoomId, RoomStatus,
    RoundData, RoundRecord, ServerEvent,
};
use flag_frenzy_client::{FlagFrenzyError, Transport};
use uuid::Uuid;

// ── Ids ─────────────────────────────────────────────────────────────

pub fn room_id() -> RoomId {
    Uuid::from_u128(0x100)
}

pub fn other_room_id() -> RoomId {
    Uuid::from_u128(0x200)
}

pub fn game_id() -> GameId {
    Uuid::from_u128(0x300)
}

// ── Entity helpers ──────────────────────────────────────────────────

/// A room hosted by `alice`, optionally with a guest.
pub fn sample_room(guest: Option<&str>) -> Room {
    Room {
        id: room_id(),
        host_name: "alice".into(),
        guest_name: guest.map(String::from),
        status: RoomStatus::Open,
        number_of_rounds: 10,
        created_at: "2026-01-01T00:00:00Z".into(),
        updated_at: None,
    }
}

/// An in-progress game in [`room_id`] at the given round.
pub fn sample_game(round: u32, time_remaining: u32) -> Game {
    Game {
        id: game_id(),
        room_id: room_id(),
        host_name: "alice".into(),
        guest_name: Some("bob".into()),
        host_score: 2,
        guest_score: Some(1),
        total_rounds: 10,
        current_round: round,
        status: GameStatus::InProgress,
        current_round_data: Some(RoundData {
            round_number: round,
            country_id: "FR".into(),
            time_remaining,
            round_active: true,
        }),
    }
}

/// A completed copy of [`sample_game`].
pub fn completed_game(round: u32) -> Game {
    let mut game = sample_game(round, 0);
    game.status = GameStatus::Completed;
    game.current_round_data = None;
    game
}

pub fn sample_history() -> Vec<RoundRecord> {
    vec![RoundRecord {
        round_number: 1,
        country_id: "FR".into(),
        country_name: "France".into(),
        guesses: vec![],
    }]
}

pub fn round_started_json(game: &Game) -> String {
    serde_json::to_string(&ServerEvent::RoundStarted(Box::new(game.clone()))).unwrap()
}

pub fn room_update_json(room: &Room) -> String {
    serde_json::to_string(&ServerEvent::RoomUpdate(Box::new(room.clone()))).unwrap()
}

// ── MockTransport ───────────────────────────────────────────────────

/// A channel-based mock transport for integration testing.
///
/// Scripted server frames are consumed in order by `recv()`; an explicit
/// `None` entry signals a clean transport close. Once the script is
/// exhausted, `recv()` hangs so the socket loop stays alive until shutdown.
/// All frames sent by the client are recorded in `sent`.
pub struct MockTransport {
    incoming: VecDeque<Option<Result<String>>>,
    pub sent: Arc<StdMutex<Vec<String>>>,
    pub closed: Arc<AtomicBool>,
    /// When false, `recv()` returns `None` immediately after the script
    /// runs out instead of hanging (simulates a transport drop).
    hang_when_drained: bool,
}

impl MockTransport {
    pub fn new(incoming: Vec<Option<Result<String>>>) -> (Self, Arc<StdMutex<Vec<String>>>) {
        let sent = Arc::new(StdMutex::new(Vec::new()));
        let transport = Self {
            incoming: VecDeque::from(incoming),
            sent: Arc::clone(&sent),
            closed: Arc::new(AtomicBool::new(false)),
            hang_when_drained: true,
        };
        (transport, sent)
    }

    /// A transport that drops (clean close) once its script is exhausted.
    pub fn dropping(incoming: Vec<Option<Result<String>>>) -> (Self, Arc<StdMutex<Vec<String>>>) {
        let (mut transport, sent) = Self::new(incoming);
        transport.hang_when_drained = false;
        (transport, sent)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<()> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        if let Some(item) = self.incoming.pop_front() {
            item
        } else if self.hang_when_drained {
            std::future::pending().await
        } else {
            None
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── MockDialer ──────────────────────────────────────────────────────

/// Hands out scripted [`MockTransport`]s, one per dial. Once the script is
/// exhausted every further dial fails.
pub struct MockDialer {
    transports: StdMutex<VecDeque<MockTransport>>,
    pub dials: AtomicUsize,
}

impl MockDialer {
    pub fn new(transports: Vec<MockTransport>) -> Self {
        Self {
            transports: StdMutex::new(VecDeque::from(transports)),
            dials: AtomicUsize::new(0),
        }
    }

    pub fn dial_count(&self) -> usize {
        self.dials.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Dialer for MockDialer {
    async fn dial(&self, _token: &str) -> Result<Box<dyn Transport>> {
        self.dials.fetch_add(1, Ordering::Relaxed);
        match self.transports.lock().unwrap().pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(FlagFrenzyError::NotConnected),
        }
    }
}

// ── MockApi ─────────────────────────────────────────────────────────

/// Scripted [`GameApi`] implementation.
///
/// Queued responses are consumed in order; empty queues fall back to the
/// configured defaults or `NotFound`. Call counters make polling and
/// history behavior observable.
#[derive(Default)]
pub struct MockApi {
    pub room_response: StdMutex<Option<Room>>,
    pub game_by_room: StdMutex<Option<Game>>,
    pub start_game_response: StdMutex<Option<Game>>,
    /// Responses for `fetch_game`, consumed front to back.
    pub poll_responses: StdMutex<VecDeque<Game>>,
    pub guess_responses: StdMutex<VecDeque<Result<GuessOutcome>>>,
    pub history_response: StdMutex<Option<Vec<RoundRecord>>>,
    pub stats: StdMutex<HashMap<String, PlayerStats>>,

    pub poll_calls: AtomicUsize,
    pub guess_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub invite_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_room(&self, room: Room) {
        *self.room_response.lock().unwrap() = Some(room);
    }

    pub fn set_game_by_room(&self, game: Game) {
        *self.game_by_room.lock().unwrap() = Some(game);
    }

    pub fn push_poll_response(&self, game: Game) {
        self.poll_responses.lock().unwrap().push_back(game);
    }

    pub fn push_guess_response(&self, outcome: Result<GuessOutcome>) {
        self.guess_responses.lock().unwrap().push_back(outcome);
    }

    pub fn set_history(&self, history: Vec<RoundRecord>) {
        *self.history_response.lock().unwrap() = Some(history);
    }

    pub fn set_stats(&self, user_name: &str, stats: PlayerStats) {
        self.stats.lock().unwrap().insert(user_name.into(), stats);
    }

    pub fn polls(&self) -> usize {
        self.poll_calls.load(Ordering::Relaxed)
    }

    pub fn history_fetches(&self) -> usize {
        self.history_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl GameApi for MockApi {
    async fn create_room(&self) -> Result<Room> {
        self.room_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(FlagFrenzyError::NotFound)
    }

    async fn fetch_room(&self, room_id: RoomId) -> Result<Room> {
        match self.room_response.lock().unwrap().clone() {
            Some(room) if room.id == room_id => Ok(room),
            _ => Err(FlagFrenzyError::NotFound),
        }
    }

    async fn cancel_room(&self) -> Result<()> {
        self.cancel_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn invite_friend(&self, _friend_user_name: &str) -> Result<()> {
        self.invite_calls.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update_rounds(&self, room_id: RoomId, number_of_rounds: u32) -> Result<Room> {
        let mut room = self
            .room_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(FlagFrenzyError::NotFound)?;
        if room.id != room_id {
            return Err(FlagFrenzyError::NotFound);
        }
        room.number_of_rounds = number_of_rounds;
        Ok(room)
    }

    async fn start_game(&self, _room_id: RoomId) -> Result<Game> {
        self.start_game_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(FlagFrenzyError::NotFound)
    }

    async fn fetch_game(&self, _game_id: GameId) -> Result<Game> {
        self.poll_calls.fetch_add(1, Ordering::Relaxed);
        self.poll_responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(FlagFrenzyError::NotFound)
    }

    async fn fetch_game_by_room(&self, _room_id: RoomId) -> Result<Game> {
        self.game_by_room
            .lock()
            .unwrap()
            .clone()
            .ok_or(FlagFrenzyError::NotFound)
    }

    async fn submit_guess(&self, _request: &GuessRequest) -> Result<GuessOutcome> {
        self.guess_calls.fetch_add(1, Ordering::Relaxed);
        self.guess_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FlagFrenzyError::NotFound))
    }

    async fn fetch_round_history(&self, _game_id: GameId) -> Result<Vec<RoundRecord>> {
        self.history_calls.fetch_add(1, Ordering::Relaxed);
        self.history_response
            .lock()
            .unwrap()
            .clone()
            .ok_or(FlagFrenzyError::NotFound)
    }

    async fn fetch_player_stats(&self, user_name: &str) -> Result<PlayerStats> {
        self.stats_calls.fetch_add(1, Ordering::Relaxed);
        self.stats
            .lock()
            .unwrap()
            .get(user_name)
            .cloned()
            .ok_or(FlagFrenzyError::NotFound)
    }
}
