// ── Controller ──
//
// Lifecycle facade for one portal account. Owns the sync loop: a short
// tick that keeps the session alive and launches the heartbeat and
// change-check sub-tasks at their own pace, each exclusive with itself.
// A changed revision code triggers a full refresh, which feeds the change
// detector, rebuilds the canonical device list and applies it to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alarmsync_api::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, Portal, SensorInfo, SensorStatus,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::config::{SyncConfig, SyncMode};
use crate::detect::{ChangeDetector, DetectionSink, Observation, ResourceKind, TracingSink};
use crate::error::CoreError;
use crate::flag::ActivityFlag;
use crate::model::Device;
use crate::reconcile::{self, Mismatch, Reconciliation};
use crate::registry::{ApplyReport, MemoryRegistry, RegistryAdapter};
use crate::session::{AuthOutcome, SessionController, SessionState};

/// Outcome of one [`Controller::refresh`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshReport {
    /// Resources whose fetch failed; their previous values were kept.
    pub failed: Vec<ResourceKind>,
    pub applied: ApplyReport,
    pub device_count: usize,
    /// Configured sensors the portal listing did not account for.
    pub unmatched: Vec<Mismatch>,
}

/// What one sync tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Another tick was still running.
    Skipped,
    /// No session; nothing scheduled.
    Unauthenticated,
    /// Waited out a login cooldown.
    CooledDown,
    /// Shut down during a cooldown wait.
    Cancelled,
    /// Authenticated; due sub-tasks were launched.
    Ran,
}

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: SyncConfig,
    portal: Arc<dyn Portal>,
    session: SessionController,
    detector: ChangeDetector,
    registry: RegistryAdapter,

    syncing: ActivityFlag,
    heartbeat_in_flight: ActivityFlag,
    check_in_flight: ActivityFlag,
    last_heartbeat: Mutex<Instant>,
    last_change_check: Mutex<Instant>,
    revision: Mutex<Option<String>>,

    slots: Mutex<Slots>,
    refresh_lock: tokio::sync::Mutex<()>,
    devices: watch::Sender<Arc<Vec<Device>>>,
    last_refresh: Mutex<Option<DateTime<Utc>>>,

    started: AtomicBool,
    cancel: CancellationToken,
    tracker: TaskTracker,
    sync_loop: Mutex<Option<JoinHandle<()>>>,
}

/// Latest successfully fetched payload per resource.
#[derive(Default)]
struct Slots {
    gateway: Option<GatewayInfo>,
    panel: Option<PanelInfo>,
    panel_status: Option<PanelStatus>,
    sensors_info: Option<Vec<SensorInfo>>,
    sensors_status: Option<Vec<SensorStatus>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Controller {
    /// Validate `config` and build a controller. Nothing runs until
    /// [`start()`](Self::start).
    pub fn new(
        config: SyncConfig,
        portal: Arc<dyn Portal>,
        registry: RegistryAdapter,
        sink: Arc<dyn DetectionSink>,
    ) -> Result<Self, CoreError> {
        config.validate()?;

        let session = SessionController::new(
            Arc::clone(&portal),
            config.credentials.clone(),
            config.timing.max_login_attempts,
            config.login_cooldown(),
        );
        let (devices, _) = watch::channel(Arc::new(Vec::new()));
        let now = Instant::now();

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                portal,
                session,
                detector: ChangeDetector::new(sink),
                registry,
                syncing: ActivityFlag::new(),
                heartbeat_in_flight: ActivityFlag::new(),
                check_in_flight: ActivityFlag::new(),
                last_heartbeat: Mutex::new(now),
                last_change_check: Mutex::new(now),
                revision: Mutex::new(None),
                slots: Mutex::new(Slots::default()),
                refresh_lock: tokio::sync::Mutex::new(()),
                devices,
                last_refresh: Mutex::new(None),
                started: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                tracker: TaskTracker::new(),
                sync_loop: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the mode-dependent start-up.
    ///
    /// `normal` spawns the sync loop; `paused` signs in once; `reset`
    /// removes every restored device. Only the first call does anything.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Err(CoreError::AlreadyStarted);
        }

        match self.inner.config.mode {
            SyncMode::Normal => {
                let inner = Arc::clone(&self.inner);
                let cancel = self.inner.cancel.child_token();
                let handle = tokio::spawn(sync_loop(inner, cancel));
                *lock(&self.inner.sync_loop) = Some(handle);
                info!(tick = ?self.inner.config.tick_interval(), "sync loop started");
            }
            SyncMode::Paused => {
                let outcome = self.inner.ensure_authenticated().await;
                info!(authenticated = outcome.is_authenticated(), "paused mode; no polling scheduled");
            }
            SyncMode::Reset => {
                let removed = self.inner.registry.reset();
                info!(removed, "reset mode; registry cleared, no polling scheduled");
            }
        }
        Ok(())
    }

    /// Stop ticking, let in-flight work finish, then end the session.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = lock(&self.inner.sync_loop).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "sync loop ended abnormally");
            }
        }

        self.inner.tracker.close();
        self.inner.tracker.wait().await;

        self.inner.session.logout().await;
        debug!("controller shut down");
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// Sign in once, run `f`, sign out.
    ///
    /// No scheduling and no cooldown wait: a failed sign-in is returned
    /// straight away. Device records go to a throwaway in-memory registry.
    pub async fn oneshot<F, Fut, T>(
        config: SyncConfig,
        portal: Arc<dyn Portal>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let registry = RegistryAdapter::new(Arc::new(MemoryRegistry::new()));
        let controller = Controller::new(config, portal, registry, Arc::new(TracingSink))?;

        match controller.inner.ensure_authenticated().await {
            AuthOutcome::AlreadyAuthenticated | AuthOutcome::Authenticated(_) => {}
            AuthOutcome::Failed(e) => return Err(e.into()),
            AuthOutcome::CoolingDown { remaining } => {
                return Err(CoreError::CoolingDown {
                    remaining_secs: remaining.as_secs(),
                });
            }
            AuthOutcome::InFlight => {
                return Err(CoreError::Internal("sign-in already in progress".into()));
            }
        }

        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    // ── Operations ───────────────────────────────────────────────

    /// Fetch every resource, detect changes, rebuild and apply the device
    /// list. Concurrent callers queue behind each other.
    pub async fn refresh(&self) -> RefreshReport {
        self.inner.refresh().await
    }

    /// Arm or disarm the panel, starting from the last fetched panel state.
    pub async fn set_panel_status(&self, target: ArmState) -> Result<(), CoreError> {
        let current = lock(&self.inner.slots)
            .panel_status
            .as_ref()
            .map(|s| s.state)
            .ok_or(CoreError::PanelStatusUnknown)?;

        self.inner.portal.set_panel_status(current, target).await?;
        info!(from = %current, to = %target, "panel state change requested");
        Ok(())
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to the canonical device list.
    pub fn devices(&self) -> watch::Receiver<Arc<Vec<Device>>> {
        self.inner.devices.subscribe()
    }

    pub fn devices_snapshot(&self) -> Arc<Vec<Device>> {
        self.inner.devices.borrow().clone()
    }

    /// Subscribe to session state changes.
    pub fn session_state(&self) -> watch::Receiver<SessionState> {
        self.inner.session.state()
    }

    pub fn gateway(&self) -> Option<GatewayInfo> {
        lock(&self.inner.slots).gateway.clone()
    }

    pub fn panel(&self) -> Option<PanelInfo> {
        lock(&self.inner.slots).panel.clone()
    }

    pub fn panel_status(&self) -> Option<PanelStatus> {
        lock(&self.inner.slots).panel_status.clone()
    }

    /// Sensors as the portal last reported them, configured or not.
    pub fn sensors_info(&self) -> Option<Vec<SensorInfo>> {
        lock(&self.inner.slots).sensors_info.clone()
    }

    pub fn sensors_status(&self) -> Option<Vec<SensorStatus>> {
        lock(&self.inner.slots).sensors_status.clone()
    }

    /// Last revision code seen by a change-check.
    pub fn revision(&self) -> Option<String> {
        lock(&self.inner.revision).clone()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *lock(&self.inner.last_refresh)
    }
}

// ── Engine internals ─────────────────────────────────────────────

impl ControllerInner {
    /// Sign in if needed; a fresh session restarts sub-task pacing and is
    /// surfaced to the detector.
    async fn ensure_authenticated(&self) -> AuthOutcome {
        let outcome = self.session.ensure_authenticated().await;
        if let AuthOutcome::Authenticated(info) = &outcome {
            let now = Instant::now();
            *lock(&self.last_heartbeat) = now;
            *lock(&self.last_change_check) = now;
            self.detector
                .notify_if_new(Observation::Session(info.clone()));
        }
        outcome
    }

    /// Launch a tick unless one is still running. The tick runs in its own
    /// task so a panic in it is contained and logged.
    fn dispatch_tick(self: &Arc<Self>, cancel: &CancellationToken) {
        if self.syncing.is_set() {
            trace!("sync in progress; skipping tick");
            return;
        }
        let tick = tokio::spawn(Arc::clone(self).sync_tick(cancel.clone()));
        self.tracker.spawn(async move {
            match tick.await {
                Ok(outcome) => trace!(?outcome, "sync tick finished"),
                Err(e) if e.is_panic() => error!("sync tick panicked; continuing with the next tick"),
                Err(e) => debug!(error = %e, "sync tick aborted"),
            }
        });
    }

    async fn sync_tick(self: Arc<Self>, cancel: CancellationToken) -> TickOutcome {
        let Some(_sync) = self.syncing.try_acquire() else {
            return TickOutcome::Skipped;
        };

        match self.ensure_authenticated().await {
            AuthOutcome::AlreadyAuthenticated | AuthOutcome::Authenticated(_) => {}
            AuthOutcome::CoolingDown { remaining } => {
                info!(remaining_secs = remaining.as_secs(), "sign-in cooling down; sync paused");
                tokio::select! {
                    () = cancel.cancelled() => return TickOutcome::Cancelled,
                    () = tokio::time::sleep(remaining) => {}
                }
                self.session.end_cooldown();
                return TickOutcome::CooledDown;
            }
            AuthOutcome::Failed(_) | AuthOutcome::InFlight => return TickOutcome::Unauthenticated,
        }

        if is_due(&self.last_heartbeat, self.config.heartbeat_interval())
            && !self.heartbeat_in_flight.is_set()
        {
            let inner = Arc::clone(&self);
            self.tracker.spawn(async move { inner.heartbeat().await });
        }

        if is_due(&self.last_change_check, self.config.change_check_interval())
            && !self.check_in_flight.is_set()
        {
            let inner = Arc::clone(&self);
            self.tracker.spawn(async move { inner.change_check().await });
        }

        TickOutcome::Ran
    }

    async fn heartbeat(&self) {
        let Some(_in_flight) = self.heartbeat_in_flight.try_acquire() else {
            return;
        };

        match self.portal.perform_heartbeat().await {
            Ok(()) => debug!("heartbeat ok"),
            Err(e) => warn!(error = %e, "heartbeat failed"),
        }
        *lock(&self.last_heartbeat) = Instant::now();
    }

    async fn change_check(&self) {
        let Some(_in_flight) = self.check_in_flight.try_acquire() else {
            return;
        };

        match self.portal.perform_change_check().await {
            Ok(code) => {
                let previous = {
                    let mut cached = lock(&self.revision);
                    if cached.as_deref() == Some(code.as_str()) {
                        None
                    } else {
                        Some(cached.replace(code.clone()))
                    }
                };
                if let Some(previous) = previous {
                    info!(
                        from = previous.as_deref().unwrap_or("<none>"),
                        to = %code,
                        "portal state revision changed"
                    );
                    self.refresh().await;
                } else {
                    trace!(revision = %code, "no portal changes");
                }
            }
            Err(e) => warn!(error = %e, "change check failed"),
        }
        *lock(&self.last_change_check) = Instant::now();
    }

    async fn refresh(&self) -> RefreshReport {
        let _serialized = self.refresh_lock.lock().await;
        let portal = &self.portal;

        let (gateway, panel, panel_status, sensors_info, sensors_status) = tokio::join!(
            async {
                let result = portal.fetch_gateway_info().await;
                self.settle(ResourceKind::Gateway, result, Observation::Gateway, |s, v| {
                    s.gateway = Some(v);
                })
            },
            async {
                let result = portal.fetch_panel_info().await;
                self.settle(ResourceKind::Panel, result, Observation::Panel, |s, v| {
                    s.panel = Some(v);
                })
            },
            async {
                let result = portal.fetch_panel_status().await;
                self.settle(ResourceKind::PanelStatus, result, Observation::PanelStatus, |s, v| {
                    s.panel_status = Some(v);
                })
            },
            async {
                let result = portal.fetch_sensors_info().await;
                self.settle(ResourceKind::SensorsInfo, result, Observation::SensorsInfo, |s, v| {
                    s.sensors_info = Some(v);
                })
            },
            async {
                let result = portal.fetch_sensors_status().await;
                self.settle(
                    ResourceKind::SensorsStatus,
                    result,
                    Observation::SensorsStatus,
                    |s, v| s.sensors_status = Some(v),
                )
            },
        );

        let failed: Vec<ResourceKind> = [gateway, panel, panel_status, sensors_info, sensors_status]
            .into_iter()
            .flatten()
            .collect();

        let Reconciliation { devices, unmatched } = {
            let slots = lock(&self.slots);
            if slots.sensors_info.is_none() && !self.config.sensors.is_empty() {
                warn!(
                    configured = self.config.sensors.len(),
                    "no sensor listing from the portal yet; sensor matching skipped"
                );
            }
            reconcile::unify(
                slots.gateway.as_ref(),
                slots.panel.as_ref(),
                slots.sensors_info.as_deref(),
                &self.config.sensors,
            )
        };
        for mismatch in &unmatched {
            warn!(%mismatch, "skipping sensor");
        }
        let device_count = devices.len();
        let applied = self.registry.diff_and_apply(&devices);
        self.devices.send_replace(Arc::new(devices));
        *lock(&self.last_refresh) = Some(Utc::now());

        if !failed.is_empty() {
            warn!(failed = ?failed, "refresh incomplete; previous values kept");
        }
        RefreshReport {
            failed,
            applied,
            device_count,
            unmatched,
        }
    }

    /// Store a fetched payload and run it through the detector, or log the
    /// failure and keep the old value. Returns the kind on failure.
    fn settle<T: Clone>(
        &self,
        kind: ResourceKind,
        result: Result<T, alarmsync_api::Error>,
        observe: impl FnOnce(T) -> Observation,
        store: impl FnOnce(&mut Slots, T),
    ) -> Option<ResourceKind> {
        match result {
            Ok(value) => {
                store(&mut lock(&self.slots), value.clone());
                self.detector.notify_if_new(observe(value));
                None
            }
            Err(e) => {
                warn!(resource = %kind, error = %e, "fetch failed; keeping previous value");
                Some(kind)
            }
        }
    }
}

fn is_due(last_run: &Mutex<Instant>, interval: Duration) -> bool {
    lock(last_run).elapsed() >= interval
}

/// Drive ticks until cancelled.
async fn sync_loop(inner: Arc<ControllerInner>, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(inner.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => inner.dispatch_tick(&cancel),
        }
    }
    debug!("sync loop stopped");
}
