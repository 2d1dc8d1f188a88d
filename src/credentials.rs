//! Session credential seam.
//!
//! The client never issues or stores credentials itself — an external auth
//! layer owns the bearer token (created at login, rotated on refresh,
//! destroyed at logout). This module defines the narrow interface the
//! client needs: "fetch the current token, if any" and "invalidate the
//! session" (called when the server answers 401).
//!
//! A missing token means the client is logged out: the socket must not
//! connect and the unload beacon must not fire.

use std::sync::Mutex;

/// Provides the current bearer credential to the client.
///
/// Implementations must be cheap to call — the token is re-read on every
/// reconnect attempt and every authenticated request so rotation is picked
/// up without restarting the client.
pub trait CredentialProvider: Send + Sync + 'static {
    /// The current bearer token, or `None` when logged out.
    fn token(&self) -> Option<String>;

    /// Drop the current session. Called when the server rejects the
    /// credential (HTTP 401); subsequent [`token`](Self::token) calls
    /// must return `None` until the external auth layer logs in again.
    fn invalidate(&self);
}

/// An in-process [`CredentialProvider`] backed by a mutex-guarded slot.
///
/// Suitable for applications that receive the token from their own login
/// flow, and for tests.
#[derive(Debug, Default)]
pub struct MemoryCredentials {
    token: Mutex<Option<String>>,
}

impl MemoryCredentials {
    /// Create an empty (logged-out) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    /// Replace the stored token (login or rotation).
    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = Some(token.into());
        }
    }

    /// Clear the stored token (logout).
    pub fn clear(&self) {
        if let Ok(mut slot) = self.token.lock() {
            *slot = None;
        }
    }
}

impl CredentialProvider for MemoryCredentials {
    fn token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|slot| slot.clone())
    }

    fn invalidate(&self) {
        tracing::debug!("session credential invalidated");
        self.clear();
    }
}
