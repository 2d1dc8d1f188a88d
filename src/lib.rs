//! # Flag Frenzy Client
//!
//! Async session-synchronization client for the Flag Frenzy real-time
//! flag-guessing game.
//!
//! This crate keeps a player's local view of room and game state consistent
//! in the presence of two independent channels — a persistent push socket
//! that may silently drop, duplicate, or reorder, and a periodic
//! authoritative HTTP re-fetch — while driving a locally-ticking countdown
//! that stays within bounded drift of server truth.
//!
//! ## Features
//!
//! - **Transport-agnostic** — implement the [`Transport`] trait for any
//!   backend; the default `transport-websocket` feature provides
//!   [`WebSocketTransport`]
//! - **Seam-based REST** — implement [`GameApi`] for any backend; the
//!   default `http-api` feature provides [`HttpApi`]
//! - **One typed event bus** — last-value query plus live subscription per
//!   topic, plus room-scoped dispatch ([`EventBus`])
//! - **Convergent state** — push, poll, and guess responses merge through
//!   the same logic, decided by round number and guest presence, never by
//!   arrival order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let credentials = Arc::new(MemoryCredentials::with_token(token));
//! let bus = Arc::new(EventBus::new());
//! let api: Arc<dyn GameApi> =
//!     Arc::new(HttpApi::new("https://play.flagfrenzy.io/api/v1", credentials.clone())?);
//!
//! let dialer = Arc::new(WebSocketDialer::new("wss://play.flagfrenzy.io/ws-native"));
//! let manager = ConnectionManager::new(dialer, credentials.clone(), bus.clone());
//! manager.connect();
//!
//! let session = GameSession::new(api, bus, room_id);
//! session.start().await?;
//! let mut view = session.watch();
//! while view.changed().await.is_ok() {
//!     let snapshot = view.borrow().clone();
//!     render(&snapshot);
//! }
//! ```

pub mod api;
#[cfg(feature = "http-api")]
pub mod beacon;
pub mod bus;
pub mod connection;
pub mod credentials;
pub mod error;
#[cfg(feature = "http-api")]
pub mod http;
pub mod protocol;
pub mod room;
pub mod session;
pub mod transport;
pub mod transports;

// Re-export primary types for ergonomic imports.
pub use api::GameApi;
#[cfg(feature = "http-api")]
pub use beacon::LeaveBeacon;
pub use bus::{EventBus, HandlerId};
pub use connection::{ConnectionManager, Dialer};
pub use credentials::{CredentialProvider, MemoryCredentials};
pub use error::FlagFrenzyError;
#[cfg(feature = "http-api")]
pub use http::HttpApi;
pub use protocol::{ClientFrame, Game, Room, ServerEvent, Topic};
pub use room::{HostFlags, RoomWatcher};
pub use session::{GameSession, RoundPhase};
pub use transport::Transport;

#[cfg(feature = "transport-websocket")]
pub use transports::websocket::{WebSocketDialer, WebSocketTransport};
