// ── Core error types ──
//
// Errors surfaced by the sync engine to its callers (CLI, host). The
// `From<alarmsync_api::Error>` impl translates portal-layer failures into
// engine-level variants; callers never match on reqwest errors.

use alarmsync_api::ArmState;
use thiserror::Error;

use crate::config::ConfigError;
use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Portal session was invalidated")]
    SessionInvalidated,

    #[error("Not signed in to the portal")]
    NotAuthenticated,

    #[error("Sign-in suspended after repeated failures; retry in {remaining_secs}s")]
    CoolingDown { remaining_secs: u64 },

    // ── Connectivity errors ──────────────────────────────────────────
    #[error("Cannot reach the portal: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Portal request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Unexpected portal response: {message}")]
    UnexpectedResponse { message: String },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Cannot change panel state from {from} to {to}")]
    InvalidStateTransition { from: ArmState, to: ArmState },

    #[error("Panel state is not known yet; refresh before sending a command")]
    PanelStatusUnknown,

    // ── Engine errors ────────────────────────────────────────────────
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Controller already started")]
    AlreadyStarted,

    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from portal-layer errors ──────────────────────────────

impl From<alarmsync_api::Error> for CoreError {
    fn from(err: alarmsync_api::Error) -> Self {
        use alarmsync_api::Error as Api;

        match err {
            Api::Authentication { message } => Self::AuthenticationFailed { message },
            Api::SessionInvalidated => Self::SessionInvalidated,
            Api::NotAuthenticated => Self::NotAuthenticated,
            Api::Transport(e) => {
                if e.is_timeout() {
                    Self::Timeout
                } else {
                    Self::ConnectionFailed {
                        reason: e.to_string(),
                    }
                }
            }
            Api::InvalidUrl(e) => Self::ConnectionFailed {
                reason: format!("invalid portal URL: {e}"),
            },
            Api::ClientSetup(reason) => Self::ConnectionFailed { reason },
            Api::UnexpectedResponse { message, body: _ } => Self::UnexpectedResponse { message },
            Api::InvalidStateTransition { from, to } => Self::InvalidStateTransition { from, to },
        }
    }
}

/// Failures reported by the host's device registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Device {0} is already registered")]
    AlreadyExists(DeviceId),

    #[error("Device {0} is not registered")]
    NotFound(DeviceId),

    #[error("Registry rejected device {id}: {message}")]
    Rejected { id: DeviceId, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portal_errors_map_to_engine_variants() {
        let err: CoreError = alarmsync_api::Error::Authentication {
            message: "nope".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { message } if message == "nope"));

        let err: CoreError = alarmsync_api::Error::InvalidStateTransition {
            from: ArmState::Away,
            to: ArmState::Night,
        }
        .into();
        assert!(matches!(
            err,
            CoreError::InvalidStateTransition {
                from: ArmState::Away,
                to: ArmState::Night
            }
        ));
    }
}
