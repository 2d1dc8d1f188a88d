//! Game session: round lifecycle, countdown, polling fallback, guesses.
//!
//! [`GameSession`] keeps one authoritative [`Game`] per active room view
//! and is its sole writer. Updates arrive from three interleaved sources —
//! pushed `round-started`/`game-ended` events, the 500 ms polling fallback,
//! and guess responses — and all of them funnel through one merge routine
//! that decides by **round number and status**, never by arrival order.
//! Whichever channel notices a round change first drives the transition;
//! the other channel's later, now-redundant notice is a no-op.
//!
//! The countdown is locally ticking state synchronized to server truth: a
//! round transition restarts it from the server-supplied seconds (and
//! clears the in-progress guess draft), while a same-round poll whose
//! remaining time drifts more than [`DRIFT_TOLERANCE_SECS`] resynchronizes
//! the number without touching the draft. At most one ticker is ever live:
//! starting a countdown always cancels the previous one first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::GameApi;
use crate::bus::EventBus;
use crate::error::{FlagFrenzyError, Result};
use crate::protocol::{
    Game, GameStatus, GuessRequest, RoomId, RoundRecord, ServerEvent, Topic,
};

/// Polling fallback interval while a game is active.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Maximum tolerated gap, in seconds, between the local countdown and the
/// server-reported remaining time before the countdown is resynchronized.
pub const DRIFT_TOLERANCE_SECS: u32 = 2;

/// Delay before the authoritative completion re-fetch after the final
/// round's countdown reaches zero.
const COMPLETION_REFETCH_DELAY: Duration = Duration::from_secs(1);

/// Terminal token rendered once the countdown has expired.
const TIME_UP_TOKEN: &str = "Time's up!";

// ── Round lifecycle ─────────────────────────────────────────────────

/// Lifecycle phase of the current round.
///
/// `NoRound → Active → (Expired | Answered) → NoRound` for the next round,
/// or `Completed` once the server ends the game (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    /// No round is running (before the game loads, or between rounds).
    #[default]
    NoRound,
    /// A round is running and this client has not answered yet.
    Active,
    /// The countdown reached zero before this client answered.
    Expired,
    /// This client submitted a guess; waiting for the server to advance.
    Answered,
    /// The game is over. Terminal.
    Completed,
}

/// Which side of the scoreboard a score delta is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSide {
    Host,
    Guest,
}

/// Derive who scored by comparing scores across two game snapshots.
///
/// Best-effort heuristic: the server does not declare the scorer, so this
/// drives only a transient visual cue and carries no state-machine
/// consequence. If only one side's score increased, that side scored; in
/// the both-or-neither edge cases it defaults to host. Should the server
/// grow an explicit "who scored" field, delete this rather than keep it.
pub fn score_attribution(previous: &Game, next: &Game) -> ScoreSide {
    let host_increased = next.host_score > previous.host_score;
    let guest_increased = next.guest_score.unwrap_or(0) > previous.guest_score.unwrap_or(0);
    match (host_increased, guest_increased) {
        (false, true) => ScoreSide::Guest,
        _ => ScoreSide::Host,
    }
}

/// The verdict for the most recently submitted guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessVerdict {
    pub correct: bool,
    pub points_awarded: u32,
    /// Set for correct guesses; derived via [`score_attribution`].
    pub scored_by: Option<ScoreSide>,
}

// ── View ────────────────────────────────────────────────────────────

/// Snapshot of everything a game view renders.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    /// The authoritative game, once loaded.
    pub game: Option<Game>,
    pub phase: RoundPhase,
    /// Locally ticking remaining time, in whole seconds.
    pub time_remaining: u32,
    /// The player's in-progress guess draft.
    pub guess_input: String,
    /// Whether a guess submission is outstanding.
    pub submitting: bool,
    pub last_verdict: Option<GuessVerdict>,
    /// Round-by-round history, fetched once on completion.
    pub history: Option<Vec<RoundRecord>>,
    /// Transient user-facing message.
    pub notice: Option<String>,
}

impl SessionView {
    /// The countdown as rendered: the literal number, or a fixed terminal
    /// token once it reached zero and the round is no longer active.
    pub fn timer_display(&self) -> String {
        if self.time_remaining == 0 && self.phase != RoundPhase::Active {
            TIME_UP_TOKEN.to_string()
        } else {
            self.time_remaining.to_string()
        }
    }

    /// End-of-game banner text, once the game has completed.
    pub fn winner_message(&self) -> Option<String> {
        let game = self.game.as_ref()?;
        if game.status != GameStatus::Completed {
            return None;
        }
        let guest_score = game.guest_score.unwrap_or(0);
        Some(if game.host_score > guest_score {
            format!("{} wins!", game.host_name)
        } else if guest_score > game.host_score {
            format!(
                "{} wins!",
                game.guest_name.as_deref().unwrap_or("Guest")
            )
        } else {
            "It's a tie!".to_string()
        })
    }
}

// ── Session ─────────────────────────────────────────────────────────

struct SessionInner {
    api: Arc<dyn GameApi>,
    room_id: RoomId,
    state: Mutex<SessionView>,
    view_tx: watch::Sender<SessionView>,
    ticker: Mutex<Option<tokio::task::JoinHandle<()>>>,
    poller: Mutex<Option<tokio::task::JoinHandle<()>>>,
    listener: Mutex<Option<tokio::task::JoinHandle<()>>>,
    history_fetched: AtomicBool,
    closed: AtomicBool,
}

/// Drives the round state machine for one room's game.
///
/// Construct with [`GameSession::new`] (which immediately starts listening
/// for pushed game events scoped to the room), then call
/// [`start`](Self::start) to load or start the game and begin polling.
pub struct GameSession {
    inner: Arc<SessionInner>,
}

impl GameSession {
    /// Create a session bound to `room_id` and start its push listener.
    pub fn new(api: Arc<dyn GameApi>, bus: Arc<EventBus>, room_id: RoomId) -> Self {
        let (view_tx, _view_rx) = watch::channel(SessionView::default());
        let inner = Arc::new(SessionInner {
            api,
            room_id,
            state: Mutex::new(SessionView::default()),
            view_tx,
            ticker: Mutex::new(None),
            poller: Mutex::new(None),
            listener: Mutex::new(None),
            history_fetched: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        });

        let task = tokio::spawn(listen(Arc::clone(&inner), bus));
        if let Ok(mut slot) = inner.listener.lock() {
            *slot = Some(task);
        }

        Self { inner }
    }

    /// The room this session belongs to.
    pub fn room_id(&self) -> RoomId {
        self.inner.room_id
    }

    /// Subscribe to view snapshots (last-value semantics).
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.inner.view_tx.subscribe()
    }

    /// The current view snapshot.
    pub fn view(&self) -> SessionView {
        self.inner
            .state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Load the room's game — or start a new one if none exists — then
    /// begin the polling fallback.
    ///
    /// # Errors
    ///
    /// Surfaces a notice and returns the error when neither the fetch nor
    /// the fallback start succeeds.
    pub async fn start(&self) -> Result<()> {
        let game = match self.inner.api.fetch_game_by_room(self.inner.room_id).await {
            Ok(game) => game,
            Err(FlagFrenzyError::NotFound) => {
                debug!("no existing game for room {}, starting one", self.inner.room_id);
                match self.inner.api.start_game(self.inner.room_id).await {
                    Ok(game) => game,
                    Err(e) => {
                        self.set_notice("Failed to start game");
                        return Err(e);
                    }
                }
            }
            Err(e) => {
                self.set_notice("Failed to load game");
                return Err(e);
            }
        };

        let game_id = game.id;
        let applied = integrate(&self.inner, game);
        if !matches!(applied, Applied::Completed) {
            start_polling(&self.inner, game_id);
        }
        Ok(())
    }

    /// Replace the in-progress guess draft.
    pub fn set_guess_input(&self, text: impl Into<String>) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        state.guess_input = text.into();
        self.inner.view_tx.send_replace(state.clone());
    }

    /// Submit the current guess draft.
    ///
    /// A draft that is empty after trimming, a missing game, or an already
    /// outstanding submission are silent no-ops. On success the returned
    /// game supersedes local state wholesale; on failure a transient notice
    /// is surfaced, the guard is cleared, and game state is untouched.
    pub async fn submit_guess(&self) -> Result<()> {
        let (request, previous) = {
            let Ok(mut state) = self.inner.state.lock() else {
                return Ok(());
            };
            if state.submitting {
                return Ok(());
            }
            let Some(game) = state.game.clone() else {
                return Ok(());
            };
            let guess = state.guess_input.trim().to_string();
            if guess.is_empty() {
                return Ok(());
            }
            state.submitting = true;
            state.notice = None;
            self.inner.view_tx.send_replace(state.clone());
            (
                GuessRequest {
                    game_id: game.id,
                    round_number: game.current_round,
                    guess_text: guess,
                },
                game,
            )
        };

        match self.inner.api.submit_guess(&request).await {
            Ok(outcome) => {
                let scored_by = outcome
                    .correct
                    .then(|| score_attribution(&previous, &outcome.game));
                let round_after = outcome.game.current_round;
                integrate(&self.inner, outcome.game);

                if let Ok(mut state) = self.inner.state.lock() {
                    state.submitting = false;
                    state.last_verdict = Some(GuessVerdict {
                        correct: outcome.correct,
                        points_awarded: outcome.points_awarded,
                        scored_by,
                    });
                    if let Some(message) = outcome.message {
                        state.notice = Some(message);
                    }
                    // Still the same round and unanswered until now ⇒ this
                    // client has answered it.
                    if state.phase == RoundPhase::Active && round_after == request.round_number {
                        state.phase = RoundPhase::Answered;
                    }
                    self.inner.view_tx.send_replace(state.clone());
                }
                Ok(())
            }
            Err(e) => {
                if let Ok(mut state) = self.inner.state.lock() {
                    state.submitting = false;
                    state.notice = Some("Failed to submit guess".to_string());
                    self.inner.view_tx.send_replace(state.clone());
                }
                Err(e)
            }
        }
    }

    /// Clear the transient notice.
    pub fn clear_notice(&self) {
        self.set_notice_opt(None);
    }

    /// Tear the session down: cancel the countdown, the poller, and the
    /// push listener. Idempotent; also runs on drop. After this returns no
    /// further tick or poll fetch occurs.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        stop_countdown(&self.inner);
        stop_polling(&self.inner);
        if let Ok(mut slot) = self.inner.listener.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        debug!("game session for room {} closed", self.inner.room_id);
    }

    fn set_notice(&self, notice: &str) {
        self.set_notice_opt(Some(notice.to_string()));
    }

    fn set_notice_opt(&self, notice: Option<String>) {
        let Ok(mut state) = self.inner.state.lock() else {
            return;
        };
        state.notice = notice;
        self.inner.view_tx.send_replace(state.clone());
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("room_id", &self.inner.room_id)
            .finish_non_exhaustive()
    }
}

// ── Merge ───────────────────────────────────────────────────────────

/// What [`integrate`] did with an incoming snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Applied {
    /// Snapshot was for another room or game; nothing changed.
    Ignored,
    /// Same round; scores/status adopted, countdown possibly resynced.
    Updated,
    /// A new round was adopted; draft cleared, countdown restarted.
    RoundStarted,
    /// The game completed; the machine is terminal.
    Completed,
}

/// Merge one incoming game snapshot — from push, poll, or a guess
/// response — into the session. The single convergence point: all three
/// sources are treated symmetrically.
fn integrate(inner: &Arc<SessionInner>, incoming: Game) -> Applied {
    let applied = {
        let Ok(mut state) = inner.state.lock() else {
            return Applied::Ignored;
        };
        if incoming.room_id != inner.room_id {
            return Applied::Ignored;
        }
        if let Some(current) = &state.game {
            if current.id != incoming.id {
                return Applied::Ignored;
            }
        }

        let prev_round = state.game.as_ref().map(|g| g.current_round);
        let new_round = incoming.current_round;
        let remaining = incoming.time_remaining().unwrap_or(0);
        let active = incoming
            .current_round_data
            .as_ref()
            .is_some_and(|r| r.round_active);
        let completed = incoming.status == GameStatus::Completed;

        // The incoming snapshot is authoritative; adopt it wholesale.
        state.game = Some(incoming);

        if completed {
            state.phase = RoundPhase::Completed;
            inner.view_tx.send_replace(state.clone());
            Applied::Completed
        } else if prev_round != Some(new_round) {
            // Round transition, from whichever channel noticed first.
            // Round numbers, not "already handled" flags, make the
            // redundant later notice a no-op.
            state.guess_input.clear();
            state.last_verdict = None;
            state.time_remaining = remaining;
            state.phase = if active {
                RoundPhase::Active
            } else {
                RoundPhase::NoRound
            };
            inner.view_tx.send_replace(state.clone());
            Applied::RoundStarted
        } else {
            // Same round: correct local clock skew without visibly
            // resetting the player's in-progress input.
            if active && matches!(state.phase, RoundPhase::Active | RoundPhase::Answered) {
                let local = state.time_remaining;
                if remaining.abs_diff(local) > DRIFT_TOLERANCE_SECS {
                    debug!("countdown drift: local {local}s, server {remaining}s, resyncing");
                    state.time_remaining = remaining;
                }
            }
            inner.view_tx.send_replace(state.clone());
            Applied::Updated
        }
    };

    match applied {
        Applied::Completed => finish(inner),
        Applied::RoundStarted => {
            let run = {
                inner
                    .state
                    .lock()
                    .map(|state| state.phase == RoundPhase::Active && state.time_remaining > 0)
                    .unwrap_or(false)
            };
            if run {
                start_countdown(inner);
            } else {
                stop_countdown(inner);
            }
        }
        Applied::Updated | Applied::Ignored => {}
    }
    applied
}

/// Terminal transition: stop the countdown and the poller, then fetch the
/// round-by-round history exactly once.
fn finish(inner: &Arc<SessionInner>) {
    stop_countdown(inner);
    stop_polling(inner);

    if inner.history_fetched.swap(true, Ordering::AcqRel) {
        return;
    }
    let game_id = {
        let Ok(state) = inner.state.lock() else {
            return;
        };
        state.game.as_ref().map(|g| g.id)
    };
    let Some(game_id) = game_id else {
        return;
    };
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        match inner.api.fetch_round_history(game_id).await {
            Ok(history) => {
                if let Ok(mut state) = inner.state.lock() {
                    state.history = Some(history);
                    inner.view_tx.send_replace(state.clone());
                }
            }
            Err(e) => {
                debug!("round history fetch failed: {e}");
            }
        }
    });
}

// ── Countdown ticker ────────────────────────────────────────────────

/// Start the countdown for the current round, cancelling any previously
/// running ticker first — two concurrent tickers must never coexist.
fn start_countdown(inner: &Arc<SessionInner>) {
    stop_countdown(inner);
    if inner.closed.load(Ordering::Acquire) {
        return;
    }
    let task = tokio::spawn(run_countdown(Arc::clone(inner)));
    if let Ok(mut slot) = inner.ticker.lock() {
        *slot = Some(task);
    }
}

/// Cancel the live ticker, if any. Idempotent.
fn stop_countdown(inner: &Arc<SessionInner>) {
    if let Ok(mut slot) = inner.ticker.lock() {
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

/// Decrement once per second until zero, then stop.
///
/// Reaching zero on the final round schedules a short-delay authoritative
/// re-fetch — the server, not the client, decides when the game is over.
async fn run_countdown(inner: Arc<SessionInner>) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let at_zero = {
            let Ok(mut state) = inner.state.lock() else {
                return;
            };
            state.time_remaining = state.time_remaining.saturating_sub(1);
            if state.time_remaining == 0 {
                if state.phase == RoundPhase::Active {
                    state.phase = RoundPhase::Expired;
                }
                let final_round = state.game.as_ref().is_some_and(Game::is_final_round);
                inner.view_tx.send_replace(state.clone());
                Some(final_round)
            } else {
                inner.view_tx.send_replace(state.clone());
                None
            }
        };

        match at_zero {
            Some(final_round) => {
                if final_round {
                    schedule_completion_refetch(&inner);
                }
                return;
            }
            None => continue,
        }
    }
}

/// Re-fetch the game shortly after the final countdown expires to pick up
/// the authoritative completion signal.
fn schedule_completion_refetch(inner: &Arc<SessionInner>) {
    if inner.closed.load(Ordering::Acquire) {
        return;
    }
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(COMPLETION_REFETCH_DELAY).await;
        let game_id = {
            let Ok(state) = inner.state.lock() else {
                return;
            };
            state.game.as_ref().map(|g| g.id)
        };
        let Some(game_id) = game_id else {
            return;
        };
        match inner.api.fetch_game(game_id).await {
            Ok(game) => {
                integrate(&inner, game);
            }
            Err(e) => debug!("completion re-fetch failed: {e}"),
        }
    });
}

// ── Polling fallback ────────────────────────────────────────────────

/// Start the 500 ms polling loop, cancelling any previous one first.
fn start_polling(inner: &Arc<SessionInner>, game_id: crate::protocol::GameId) {
    stop_polling(inner);
    if inner.closed.load(Ordering::Acquire) {
        return;
    }
    let task = tokio::spawn(run_poller(Arc::clone(inner), game_id));
    if let Ok(mut slot) = inner.poller.lock() {
        *slot = Some(task);
    }
}

/// Cancel the live poller, if any. Idempotent.
fn stop_polling(inner: &Arc<SessionInner>) {
    if let Ok(mut slot) = inner.poller.lock() {
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

/// Periodic authoritative re-fetch: a backstop against missed or dropped
/// push messages. Results converge through [`integrate`], never fighting
/// the push path.
async fn run_poller(inner: Arc<SessionInner>, game_id: crate::protocol::GameId) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; the game was just fetched, so
    // skip it.
    interval.tick().await;

    loop {
        interval.tick().await;
        if inner.closed.load(Ordering::Acquire) {
            return;
        }
        match inner.api.fetch_game(game_id).await {
            Ok(game) => {
                if matches!(integrate(&inner, game), Applied::Completed) {
                    return;
                }
            }
            Err(FlagFrenzyError::SessionExpired) => {
                warn!("session expired while polling game {game_id}");
                if let Ok(mut state) = inner.state.lock() {
                    state.notice = Some("Session expired. Please login again.".to_string());
                    inner.view_tx.send_replace(state.clone());
                }
                return;
            }
            Err(e) => {
                // Transient; the next poll or push re-converges.
                debug!("poll fetch failed: {e}");
            }
        }
    }
}

// ── Push listener ───────────────────────────────────────────────────

/// Consume pushed game events scoped to this session's room, catching up
/// from the last-value slots first so an event that arrived before the
/// session existed is not lost.
async fn listen(inner: Arc<SessionInner>, bus: Arc<EventBus>) {
    let mut started = bus.subscribe(Topic::GameStarted);
    let mut rounds = bus.subscribe(Topic::RoundStarted);
    let mut ended = bus.subscribe(Topic::GameEnded);

    for topic in [Topic::GameStarted, Topic::RoundStarted, Topic::GameEnded] {
        if let Some(event) = bus.latest(topic) {
            apply_push(&inner, event);
        }
    }

    loop {
        let event = tokio::select! {
            event = started.recv() => event,
            event = rounds.recv() => event,
            event = ended.recv() => event,
        };
        match event {
            Ok(event) => apply_push(&inner, event),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("game event subscriber lagged, skipped {skipped} events");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        }
    }
}

fn apply_push(inner: &Arc<SessionInner>, event: ServerEvent) {
    match event {
        ServerEvent::GameStarted(game)
        | ServerEvent::RoundStarted(game)
        | ServerEvent::GameEnded(game) => {
            integrate(inner, *game);
        }
        _ => {}
    }
}

// ── Tests ───────────────────────────────────────────────────────────
