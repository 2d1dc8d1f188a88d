//! Default [`GameApi`] implementation over HTTP using `reqwest`.
//!
//! Every request carries `Content-Type: application/json`, `Accept: */*`
//! and, when a credential is available, a bearer `Authorization` header.
//! A 401 response invalidates the session through the
//! [`CredentialProvider`] before surfacing
//! [`FlagFrenzyError::SessionExpired`].
//!
//! # Feature gate
//!
//! Only available with the `http-api` feature (enabled by default).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::GameApi;
use crate::credentials::CredentialProvider;
use crate::error::{FlagFrenzyError, Result};
use crate::protocol::{
    Game, GameId, GuessOutcome, GuessRequest, InviteRequest, PlayerStats, Room, RoomId,
    RoundRecord, StartGameRequest, StatsRequest, UpdateRoundsRequest,
};

/// Default per-request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// `GameApi` implementation backed by a shared `reqwest` client.
///
/// The credential is re-read from the [`CredentialProvider`] on every
/// request so token rotation is picked up immediately.
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpApi {
    /// Create a new API client rooted at `base_url`
    /// (e.g. `https://play.flagfrenzy.io/api/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`FlagFrenzyError::Request`] if the underlying HTTP client
    /// cannot be constructed (TLS backend initialization failure).
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn headers(&self, mut builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder = builder
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("*/*"));
        if let Some(token) = self.credentials.token() {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }

    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.credentials.invalidate();
            return Err(FlagFrenzyError::SessionExpired);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(FlagFrenzyError::NotFound);
        }
        // Error bodies are `{"message": "..."}` when the server produced
        // them; anything else degrades to the raw text.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
            .unwrap_or(body);
        Err(FlagFrenzyError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .headers(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .headers(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))?;
        let response = self.check(response).await?;
        response
            .json()
            .await
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))
    }

    async fn post_unit<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<()> {
        let response = self
            .headers(self.http.post(self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(|e| FlagFrenzyError::Request(e.to_string()))?;
        self.check(response).await.map(|_| ())
    }
}

#[async_trait]
impl GameApi for HttpApi {
    async fn create_room(&self) -> Result<Room> {
        self.post_json("rooms/create", &serde_json::json!({})).await
    }

    async fn fetch_room(&self, room_id: RoomId) -> Result<Room> {
        self.get_json(&format!("rooms/{room_id}")).await
    }

    async fn cancel_room(&self) -> Result<()> {
        self.post_unit("rooms/cancel", &serde_json::json!({})).await
    }

    async fn invite_friend(&self, friend_user_name: &str) -> Result<()> {
        let request = InviteRequest {
            friend_user_name: friend_user_name.to_string(),
        };
        self.post_unit("rooms/invite", &request).await
    }

    async fn update_rounds(&self, room_id: RoomId, number_of_rounds: u32) -> Result<Room> {
        let request = UpdateRoundsRequest {
            room_id,
            number_of_rounds,
        };
        self.post_json("rooms/rounds", &request).await
    }

    async fn start_game(&self, room_id: RoomId) -> Result<Game> {
        let request = StartGameRequest { room_id };
        self.post_json("games/start", &request).await
    }

    async fn fetch_game(&self, game_id: GameId) -> Result<Game> {
        self.get_json(&format!("games/{game_id}")).await
    }

    async fn fetch_game_by_room(&self, room_id: RoomId) -> Result<Game> {
        self.get_json(&format!("games/room/{room_id}")).await
    }

    async fn submit_guess(&self, request: &GuessRequest) -> Result<GuessOutcome> {
        self.post_json("games/guess", request).await
    }

    async fn fetch_round_history(&self, game_id: GameId) -> Result<Vec<RoundRecord>> {
        self.get_json(&format!("games/{game_id}/rounds")).await
    }

    async fn fetch_player_stats(&self, user_name: &str) -> Result<PlayerStats> {
        let request = StatsRequest {
            user_name: user_name.to_string(),
        };
        let mut stats: PlayerStats = self.post_json("games/user/info", &request).await?;
        // The endpoint omits the name in its response body.
        if stats.user_name.is_empty() {
            stats.user_name = user_name.to_string();
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}
