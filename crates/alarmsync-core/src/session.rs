// ── Session controller ──
//
// Owns the sign-in lifecycle: one attempt at a time, a failed-login
// counter, and a cooldown once the counter reaches its limit. The portal
// client owns the session itself; this type only decides when to ask for
// one.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use alarmsync_api::{Credentials, Portal, SessionInfo};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::flag::ActivityFlag;

// ── SessionState ─────────────────────────────────────────────────

/// Session state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Authenticating,
    Authenticated,
    CoolingDown,
}

/// Result of [`SessionController::ensure_authenticated`].
#[derive(Debug)]
pub enum AuthOutcome {
    /// The portal already holds a valid session; nothing was sent.
    AlreadyAuthenticated,
    /// A new session was established.
    Authenticated(SessionInfo),
    /// Another attempt is running; check again later.
    InFlight,
    /// The attempt failed and the failure budget is not yet spent.
    Failed(alarmsync_api::Error),
    /// Sign-in is suspended for `remaining`.
    CoolingDown { remaining: Duration },
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::AlreadyAuthenticated | Self::Authenticated(_))
    }
}

// ── SessionController ────────────────────────────────────────────

pub struct SessionController {
    portal: Arc<dyn Portal>,
    credentials: Credentials,
    max_attempts: u32,
    cooldown: Duration,
    authenticating: ActivityFlag,
    failed_logins: AtomicU32,
    cooldown_until: Mutex<Option<Instant>>,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(
        portal: Arc<dyn Portal>,
        credentials: Credentials,
        max_attempts: u32,
        cooldown: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            portal,
            credentials,
            max_attempts: max_attempts.max(1),
            cooldown,
            authenticating: ActivityFlag::new(),
            failed_logins: AtomicU32::new(0),
            cooldown_until: Mutex::new(None),
            state,
        }
    }

    /// Make sure a session exists, signing in if allowed.
    pub async fn ensure_authenticated(&self) -> AuthOutcome {
        if self.portal.is_authenticated() {
            return AuthOutcome::AlreadyAuthenticated;
        }

        let Some(_attempt) = self.authenticating.try_acquire() else {
            debug!("sign-in already in flight");
            return AuthOutcome::InFlight;
        };

        if let Some(remaining) = self.check_cooldown() {
            return AuthOutcome::CoolingDown { remaining };
        }

        self.publish(SessionState::Authenticating);
        debug!(username = %self.credentials.username, "signing in to portal");

        match self.portal.authenticate(&self.credentials).await {
            Ok(info) => {
                self.failed_logins.store(0, Ordering::Release);
                self.publish(SessionState::Authenticated);
                info!(portal_version = %info.portal_version, "signed in to portal");
                AuthOutcome::Authenticated(info)
            }
            Err(e) => {
                let failures = self.failed_logins.fetch_add(1, Ordering::AcqRel) + 1;
                warn!(
                    error = %e,
                    attempt = failures,
                    max_attempts = self.max_attempts,
                    "sign-in failed"
                );
                if failures >= self.max_attempts {
                    *self.cooldown_slot() = Some(Instant::now() + self.cooldown);
                    self.publish(SessionState::CoolingDown);
                    warn!(
                        cooldown_secs = self.cooldown.as_secs(),
                        "too many failed sign-ins; suspending"
                    );
                    AuthOutcome::CoolingDown {
                        remaining: self.cooldown,
                    }
                } else {
                    self.publish(SessionState::Disconnected);
                    AuthOutcome::Failed(e)
                }
            }
        }
    }

    /// Clear the failure budget after a cooldown has been waited out.
    pub fn end_cooldown(&self) {
        self.failed_logins.store(0, Ordering::Release);
        *self.cooldown_slot() = None;
        self.publish(SessionState::Disconnected);
        info!("sign-in cooldown over");
    }

    /// End the portal session if one is open. Failures are logged only.
    pub async fn logout(&self) {
        if self.portal.is_authenticated() {
            match self.portal.end_session().await {
                Ok(()) => debug!("signed out of portal"),
                Err(e) => warn!(error = %e, "sign-out failed (non-fatal)"),
            }
        }
        self.publish(SessionState::Disconnected);
    }

    // ── Observation ──────────────────────────────────────────────

    pub fn failed_logins(&self) -> u32 {
        self.failed_logins.load(Ordering::Acquire)
    }

    /// Time left in an active cooldown.
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        let until = (*self.cooldown_slot())?;
        until
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
    }

    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    // ── Internals ────────────────────────────────────────────────

    fn cooldown_slot(&self) -> MutexGuard<'_, Option<Instant>> {
        self.cooldown_until
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Remaining time of an unexpired cooldown; resets the budget when
    /// the cooldown has run out.
    fn check_cooldown(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut slot = self.cooldown_slot();
        match *slot {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                *slot = None;
                self.failed_logins.store(0, Ordering::Release);
                debug!("cooldown expired; failure budget reset");
                None
            }
            None => None,
        }
    }

    fn publish(&self, state: SessionState) {
        self.state.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alarmsync_api::MockPortal;
    use alarmsync_api::mock::Op;

    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(600);

    fn controller(portal: &MockPortal) -> SessionController {
        SessionController::new(
            Arc::new(portal.clone()),
            Credentials::new("owner@example.com", "hunter2", "fp-1"),
            3,
            COOLDOWN,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_count() {
        let portal = MockPortal::new();
        portal.fail_next_logins(1);
        let session = controller(&portal);

        assert!(matches!(session.ensure_authenticated().await, AuthOutcome::Failed(_)));
        assert_eq!(session.failed_logins(), 1);

        let outcome = session.ensure_authenticated().await;
        assert!(matches!(outcome, AuthOutcome::Authenticated(ref info) if info.portal_version == "27.0.0-140"));
        assert_eq!(session.failed_logins(), 0);
        assert_eq!(*session.state().borrow(), SessionState::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_session_is_not_renewed() {
        let portal = MockPortal::new();
        let session = controller(&portal);

        assert!(session.ensure_authenticated().await.is_authenticated());
        assert!(matches!(
            session.ensure_authenticated().await,
            AuthOutcome::AlreadyAuthenticated
        ));
        assert_eq!(portal.calls(Op::Authenticate), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn max_failures_enter_cooldown_then_recover() {
        let portal = MockPortal::new();
        portal.set_login_always_fails(true);
        let session = controller(&portal);

        assert!(matches!(session.ensure_authenticated().await, AuthOutcome::Failed(_)));
        assert!(matches!(session.ensure_authenticated().await, AuthOutcome::Failed(_)));
        let third = session.ensure_authenticated().await;
        assert!(matches!(third, AuthOutcome::CoolingDown { remaining } if remaining == COOLDOWN));
        assert_eq!(session.failed_logins(), 3);
        assert_eq!(*session.state().borrow(), SessionState::CoolingDown);

        // Fourth call during the cooldown does not reach the portal.
        tokio::time::advance(Duration::from_secs(60)).await;
        let fourth = session.ensure_authenticated().await;
        assert!(matches!(
            fourth,
            AuthOutcome::CoolingDown { remaining } if remaining == Duration::from_secs(540)
        ));
        assert_eq!(portal.calls(Op::Authenticate), 3);

        // Once the cooldown has elapsed the budget is reset and we try again.
        tokio::time::advance(Duration::from_secs(541)).await;
        portal.set_login_always_fails(false);
        assert!(matches!(
            session.ensure_authenticated().await,
            AuthOutcome::Authenticated(_)
        ));
        assert_eq!(portal.calls(Op::Authenticate), 4);
        assert_eq!(session.failed_logins(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_cooldown_resets_counter_before_attempt() {
        let portal = MockPortal::new();
        portal.set_login_always_fails(true);
        let session = controller(&portal);
        for _ in 0..3 {
            session.ensure_authenticated().await;
        }

        tokio::time::advance(COOLDOWN + Duration::from_secs(1)).await;
        assert_eq!(session.cooldown_remaining(), None);

        // One more failure counts as the first of a fresh budget.
        assert!(matches!(session.ensure_authenticated().await, AuthOutcome::Failed(_)));
        assert_eq!(session.failed_logins(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn end_cooldown_clears_budget() {
        let portal = MockPortal::new();
        portal.set_login_always_fails(true);
        let session = controller(&portal);
        for _ in 0..3 {
            session.ensure_authenticated().await;
        }
        assert!(session.cooldown_remaining().is_some());

        session.end_cooldown();

        assert_eq!(session.failed_logins(), 0);
        assert_eq!(session.cooldown_remaining(), None);
        assert_eq!(*session.state().borrow(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_attempt_reports_in_flight() {
        let portal = MockPortal::new();
        portal.set_delay(Op::Authenticate, Duration::from_secs(5));
        let session = Arc::new(controller(&portal));

        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.ensure_authenticated().await }
        });
        tokio::task::yield_now().await;

        assert!(matches!(session.ensure_authenticated().await, AuthOutcome::InFlight));
        assert!(first.await.unwrap().is_authenticated());
        assert_eq!(portal.calls(Op::Authenticate), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn logout_ends_open_session_only() {
        let portal = MockPortal::new();
        let session = controller(&portal);

        session.logout().await;
        assert_eq!(portal.calls(Op::EndSession), 0);

        session.ensure_authenticated().await;
        session.logout().await;
        assert_eq!(portal.calls(Op::EndSession), 1);
        assert!(!portal.is_authenticated());
    }
}
