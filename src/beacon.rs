//! Best-effort leave-room notification for teardown.
//!
//! When the player abandons the view (window close, navigation away), the
//! normal request pipeline may not get a chance to complete, so the leave
//! signal goes out through a dedicated fire-and-forget sender: its own
//! one-shot HTTP client with a short timeout, detached from everything
//! else. It is a courtesy signal, not a guaranteed protocol step — there is
//! no retry and no confirmation, and without a credential it is silently
//! skipped.
//!
//! # Feature gate
//!
//! Only available with the `http-api` feature (enabled by default).

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::credentials::CredentialProvider;

/// Time limit for the unload send; anything slower is abandoned.
const BEACON_TIMEOUT: Duration = Duration::from_secs(2);

/// Fire-and-forget "leaving the room" sender.
#[derive(Clone)]
pub struct LeaveBeacon {
    endpoint: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl LeaveBeacon {
    /// Create a beacon targeting the room-cancel endpoint under `base_url`.
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        let base = base_url.into();
        Self {
            endpoint: format!("{}/rooms/cancel", base.trim_end_matches('/')),
            credentials,
        }
    }

    /// Send the leave notification, carrying the current credential.
    ///
    /// Returns immediately; the send happens on a detached task. A missing
    /// credential skips the send entirely. Failures are logged at debug and
    /// otherwise ignored.
    pub fn fire(&self) {
        let Some(token) = self.credentials.token() else {
            debug!("leave beacon skipped: no credential");
            return;
        };
        let endpoint = self.endpoint.clone();

        tokio::spawn(async move {
            let client = match reqwest::Client::builder().timeout(BEACON_TIMEOUT).build() {
                Ok(client) => client,
                Err(e) => {
                    debug!("leave beacon client build failed: {e}");
                    return;
                }
            };
            let result = client
                .post(&endpoint)
                .json(&serde_json::json!({ "token": token }))
                .send()
                .await;
            match result {
                Ok(response) => {
                    debug!(status = %response.status(), "leave beacon delivered");
                }
                Err(e) => {
                    debug!("leave beacon failed: {e}");
                }
            }
        });
    }
}

impl std::fmt::Debug for LeaveBeacon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaveBeacon")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
