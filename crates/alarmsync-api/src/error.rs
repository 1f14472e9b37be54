use thiserror::Error;

use crate::models::ArmState;

/// Top-level error type for the `alarmsync-api` crate.
///
/// Covers every failure mode of a portal call: authentication, transport,
/// malformed responses, rejected commands, and session invalidation.
/// `alarmsync-core` maps these into engine-level diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Sign-in rejected (wrong credentials, unknown fingerprint, locked account).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The portal dropped the session and redirected to its sign-in page.
    #[error("Session invalidated by the portal -- re-authentication required")]
    SessionInvalidated,

    /// A session-scoped call was made before `authenticate` succeeded.
    #[error("Not authenticated")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The portal answered, but not in a shape we understand.
    #[error("Unexpected portal response: {message}")]
    UnexpectedResponse { message: String, body: String },

    // ── Commands ────────────────────────────────────────────────────
    /// The requested arm state is not reachable from the reported one.
    #[error("Cannot change panel state from {from} to {to}")]
    InvalidStateTransition { from: ArmState, to: ArmState },
}

impl Error {
    /// Returns `true` if the session is gone and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::SessionInvalidated | Self::NotAuthenticated)
    }

    /// Returns `true` if this is a transient error worth retrying on the next tick.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    pub(crate) fn unexpected(message: impl Into<String>, body: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
            body: body.into(),
        }
    }
}
