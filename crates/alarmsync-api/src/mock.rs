//! Mock portal for testing.
//!
//! Scripted results per operation, call counters, and optional per-operation
//! delays so a test can hold a call in flight while it pokes at the engine.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::auth::Credentials;
use crate::error::Error;
use crate::models::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus, SessionInfo,
};
use crate::portal::Portal;

/// Portal operations, for counting calls and scripting delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Authenticate,
    EndSession,
    GatewayInfo,
    PanelInfo,
    PanelStatus,
    SensorsInfo,
    SensorsStatus,
    SetPanelStatus,
    Heartbeat,
    ChangeCheck,
}

/// A failure to inject. `Error` itself is not `Clone`, so scripts hold this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Auth,
    Unexpected,
    SessionInvalidated,
}

impl Failure {
    fn into_error(self) -> Error {
        match self {
            Self::Auth => Error::Authentication {
                message: "mock: bad credentials".into(),
            },
            Self::Unexpected => Error::unexpected("mock: malformed response", "<html>"),
            Self::SessionInvalidated => Error::SessionInvalidated,
        }
    }
}

/// Mock portal.
///
/// Cheap to clone; clones share state, so a test keeps one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MockPortal {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    authenticated: bool,
    auth_script: VecDeque<Failure>,
    auth_fails_always: bool,
    change_codes: VecDeque<String>,
    last_change_code: Option<String>,
    heartbeat_failure: Option<Failure>,
    gateway: Option<GatewayInfo>,
    panel: Option<PanelInfo>,
    panel_status: Option<PanelStatus>,
    sensors_info: Option<Vec<SensorInfo>>,
    sensors_status: Option<Vec<SensorStatus>>,
    calls: HashMap<Op, usize>,
    delays: HashMap<Op, Duration>,
    commands: Vec<(ArmState, ArmState)>,
}

impl MockPortal {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Scripting ────────────────────────────────────────────────────

    /// Fail the next `n` sign-ins.
    pub fn fail_next_logins(&self, n: usize) {
        let mut s = self.state();
        s.auth_script.extend(std::iter::repeat_n(Failure::Auth, n));
    }

    /// Fail every sign-in until told otherwise.
    pub fn set_login_always_fails(&self, fails: bool) {
        self.state().auth_fails_always = fails;
    }

    /// Queue revision codes; once drained the last one keeps being returned.
    pub fn queue_change_codes<I, S>(&self, codes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state()
            .change_codes
            .extend(codes.into_iter().map(Into::into));
    }

    pub fn set_heartbeat_failure(&self, failure: Option<Failure>) {
        self.state().heartbeat_failure = failure;
    }

    /// Drop the session, as if the portal had expired it.
    pub fn expire_session(&self) {
        self.state().authenticated = false;
    }

    pub fn stub_gateway(&self, gateway: Option<GatewayInfo>) {
        self.state().gateway = gateway;
    }

    pub fn stub_panel(&self, panel: Option<PanelInfo>) {
        self.state().panel = panel;
    }

    pub fn stub_panel_status(&self, status: Option<PanelStatus>) {
        self.state().panel_status = status;
    }

    pub fn stub_sensors_info(&self, sensors: Option<Vec<SensorInfo>>) {
        self.state().sensors_info = sensors;
    }

    pub fn stub_sensors_status(&self, statuses: Option<Vec<SensorStatus>>) {
        self.state().sensors_status = statuses;
    }

    /// Make every call of `op` take `delay` before answering.
    pub fn set_delay(&self, op: Op, delay: Duration) {
        self.state().delays.insert(op, delay);
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn calls(&self, op: Op) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Arm/disarm commands that reached the portal, as `(current, target)`.
    pub fn commands(&self) -> Vec<(ArmState, ArmState)> {
        self.state().commands.clone()
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn enter(&self, op: Op) {
        let delay = {
            let mut s = self.state();
            *s.calls.entry(op).or_default() += 1;
            s.delays.get(&op).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn require_session(&self) -> Result<(), Error> {
        if self.state().authenticated {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    fn resource<T: Clone>(&self, pick: impl FnOnce(&MockState) -> Option<T>) -> Result<T, Error> {
        self.require_session()?;
        pick(&self.state()).ok_or_else(|| Error::unexpected("mock: resource unavailable", ""))
    }
}

#[async_trait]
impl Portal for MockPortal {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<SessionInfo, Error> {
        self.enter(Op::Authenticate).await;
        let mut s = self.state();
        if s.auth_fails_always {
            return Err(Failure::Auth.into_error());
        }
        if let Some(failure) = s.auth_script.pop_front() {
            return Err(failure.into_error());
        }
        s.authenticated = true;
        Ok(SessionInfo {
            portal_version: "27.0.0-140".into(),
        })
    }

    async fn end_session(&self) -> Result<(), Error> {
        self.enter(Op::EndSession).await;
        self.state().authenticated = false;
        Ok(())
    }

    async fn fetch_gateway_info(&self) -> Result<GatewayInfo, Error> {
        self.enter(Op::GatewayInfo).await;
        self.resource(|s| s.gateway.clone())
    }

    async fn fetch_panel_info(&self) -> Result<PanelInfo, Error> {
        self.enter(Op::PanelInfo).await;
        self.resource(|s| s.panel.clone())
    }

    async fn fetch_panel_status(&self) -> Result<PanelStatus, Error> {
        self.enter(Op::PanelStatus).await;
        self.resource(|s| s.panel_status.clone())
    }

    async fn fetch_sensors_info(&self) -> Result<Vec<SensorInfo>, Error> {
        self.enter(Op::SensorsInfo).await;
        self.resource(|s| s.sensors_info.clone())
    }

    async fn fetch_sensors_status(&self) -> Result<Vec<SensorStatus>, Error> {
        self.enter(Op::SensorsStatus).await;
        self.resource(|s| s.sensors_status.clone())
    }

    async fn set_panel_status(&self, current: ArmState, target: ArmState) -> Result<(), Error> {
        current.validate_transition(target)?;
        self.enter(Op::SetPanelStatus).await;
        self.require_session()?;
        self.state().commands.push((current, target));
        Ok(())
    }

    async fn perform_heartbeat(&self) -> Result<(), Error> {
        self.enter(Op::Heartbeat).await;
        self.require_session()?;
        match self.state().heartbeat_failure {
            Some(failure) => Err(failure.into_error()),
            None => Ok(()),
        }
    }

    async fn perform_change_check(&self) -> Result<String, Error> {
        self.enter(Op::ChangeCheck).await;
        self.require_session()?;
        let mut s = self.state();
        if let Some(code) = s.change_codes.pop_front() {
            s.last_change_code = Some(code);
        }
        Ok(s.last_change_code.clone().unwrap_or_else(|| "1-0-0".into()))
    }

    fn is_authenticated(&self) -> bool {
        self.state().authenticated
    }
}
