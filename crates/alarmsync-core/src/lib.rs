//! Sync engine between the security-system portal and a host device registry.
//!
//! This crate owns the long-running behaviour of alarmsync:
//!
//! - **[`Controller`]**: Lifecycle facade. [`start()`](Controller::start)
//!   runs the mode-dependent start-up and spawns the sync loop: one short
//!   tick that keeps the session alive and launches independently paced
//!   heartbeat and change-check sub-tasks. [`Controller::oneshot()`]
//!   authenticates once for single CLI invocations.
//!
//! - **[`SessionController`]**: Authentication state with a failed-login
//!   counter and a cooldown after too many failures.
//!
//! - **[`ChangeDetector`]**: Hashes every observed portal payload and
//!   surfaces each distinct one at most once per process.
//!
//! - **Reconciliation** ([`reconcile::unify`]): Merges gateway, panel and
//!   sensor data with the configured sensor list into canonical [`Device`]
//!   records, applied to the host through [`RegistryAdapter`].

pub mod config;
pub mod controller;
pub mod detect;
pub mod error;
pub mod flag;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ConfigError, ConfigProblem, SensorConfig, SyncConfig, SyncMode, Timing};
pub use controller::{Controller, RefreshReport};
pub use detect::{ChangeDetector, DetectionReason, DetectionSink, Observation, ResourceKind, TracingSink};
pub use error::{CoreError, RegistryError};
pub use flag::{ActivityFlag, FlagGuard};
pub use model::{Device, DeviceCategory, DeviceId, SensorType};
pub use reconcile::{Mismatch, MismatchReason, Reconciliation};
pub use registry::{ApplyReport, DeviceRegistry, MemoryRegistry, RegistryAdapter};
pub use session::{AuthOutcome, SessionController, SessionState};
