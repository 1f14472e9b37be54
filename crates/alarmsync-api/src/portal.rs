// The portal seam
//
// Everything the sync engine needs from the portal, as one object-safe
// async trait. Implementations own their session; the engine only ever
// asks whether one exists.

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus, SessionInfo,
};

/// Operations offered by a portal connection.
///
/// Implementations handle the underlying mechanism (HTTP session, mock,
/// etc). No method retries; a timeout surfaces as an ordinary error.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Sign in and establish a session.
    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionInfo, Error>;

    /// End the current session. The cached session is dropped even on error.
    async fn end_session(&self) -> Result<(), Error>;

    async fn fetch_gateway_info(&self) -> Result<GatewayInfo, Error>;

    async fn fetch_panel_info(&self) -> Result<PanelInfo, Error>;

    async fn fetch_panel_status(&self) -> Result<PanelStatus, Error>;

    async fn fetch_sensors_info(&self) -> Result<Vec<SensorInfo>, Error>;

    async fn fetch_sensors_status(&self) -> Result<Vec<SensorStatus>, Error>;

    /// Ask the panel to move from `current` to `target`.
    ///
    /// Rejected with [`Error::InvalidStateTransition`] before any network
    /// call when `target` is not reachable from `current`.
    async fn set_panel_status(&self, current: ArmState, target: ArmState) -> Result<(), Error>;

    /// Extend the session's validity.
    async fn perform_heartbeat(&self) -> Result<(), Error>;

    /// Poll the portal's state revision code (e.g. `"1-0-0"`).
    async fn perform_change_check(&self) -> Result<String, Error>;

    /// Whether a session is currently believed valid. No network call.
    fn is_authenticated(&self) -> bool;
}
