// ── Runtime sync configuration ──
//
// Describes *what* to sync and *how fast*. Carries credentials and tuning,
// but never touches disk: `alarmsync-config` loads files and hands a
// `SyncConfig` in.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;

use alarmsync_api::{Credentials, Subdomain};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

use crate::model::SensorType;

/// Accepted range for the speed multiplier.
pub const SPEED_RANGE: RangeInclusive<f64> = 0.5..=2.0;

/// Accepted alarm zone numbers.
pub const ZONE_RANGE: RangeInclusive<u32> = 1..=999;

/// What the engine does after start-up.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SyncMode {
    /// Keep the session open and mirror the portal continuously.
    #[default]
    Normal,
    /// Authenticate once, then schedule nothing.
    Paused,
    /// Remove every restored device from the registry, then schedule nothing.
    Reset,
}

/// A sensor the user expects the portal to report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorConfig {
    /// Overrides the portal name in the device record.
    #[serde(default)]
    pub display_name: Option<String>,
    pub portal_name: String,
    pub sensor_type: SensorType,
    pub zone: u32,
}

/// Base pacing before the speed multiplier is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub tick: Duration,
    pub heartbeat: Duration,
    pub change_check: Duration,
    /// Suspension after `max_login_attempts` consecutive failures. Not scaled.
    pub login_cooldown: Duration,
    pub max_login_attempts: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            heartbeat: Duration::from_secs(300),
            change_check: Duration::from_secs(3),
            login_cooldown: Duration::from_secs(600),
            max_login_attempts: 3,
        }
    }
}

/// Everything the engine needs for one portal account.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub credentials: Credentials,
    pub subdomain: Subdomain,
    pub sensors: Vec<SensorConfig>,
    pub mode: SyncMode,
    /// Divides the tick, heartbeat and change-check intervals.
    pub speed: f64,
    pub timing: Timing,
}

impl SyncConfig {
    /// Config with default pacing, normal mode, and no sensors.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            subdomain: Subdomain::default(),
            sensors: Vec::new(),
            mode: SyncMode::default(),
            speed: 1.0,
            timing: Timing::default(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.scaled(self.timing.tick)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        self.scaled(self.timing.heartbeat)
    }

    pub fn change_check_interval(&self) -> Duration {
        self.scaled(self.timing.change_check)
    }

    pub fn login_cooldown(&self) -> Duration {
        self.timing.login_cooldown
    }

    fn scaled(&self, base: Duration) -> Duration {
        if SPEED_RANGE.contains(&self.speed) {
            base.div_f64(self.speed)
        } else {
            base
        }
    }

    /// Check the whole config, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        let creds = &self.credentials;
        for (field, value) in [
            ("username", creds.username.as_str()),
            ("password", creds.password.expose_secret()),
            ("fingerprint", creds.fingerprint.as_str()),
        ] {
            if value.trim().is_empty() {
                problems.push(ConfigProblem::EmptyCredential { field });
            }
        }

        if !SPEED_RANGE.contains(&self.speed) {
            problems.push(ConfigProblem::SpeedOutOfRange(self.speed));
        }

        for (field, value) in [
            ("tick", self.timing.tick),
            ("heartbeat", self.timing.heartbeat),
            ("change_check", self.timing.change_check),
        ] {
            if value.is_zero() {
                problems.push(ConfigProblem::ZeroInterval { field });
            }
        }
        if self.timing.max_login_attempts == 0 {
            problems.push(ConfigProblem::ZeroLoginAttempts);
        }

        let mut seen: HashMap<(&str, SensorType, u32), usize> = HashMap::new();
        for (index, sensor) in self.sensors.iter().enumerate() {
            if sensor.portal_name.trim().is_empty() {
                problems.push(ConfigProblem::EmptySensorName { index });
            }
            if sensor
                .display_name
                .as_deref()
                .is_some_and(|n| n.trim().is_empty())
            {
                problems.push(ConfigProblem::EmptyDisplayName { index });
            }
            if !ZONE_RANGE.contains(&sensor.zone) {
                problems.push(ConfigProblem::ZoneOutOfRange {
                    index,
                    zone: sensor.zone,
                });
            }
            let key = (sensor.portal_name.as_str(), sensor.sensor_type, sensor.zone);
            if let Some(&first) = seen.get(&key) {
                problems.push(ConfigProblem::DuplicateSensor { index, first });
            } else {
                seen.insert(key, index);
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError { problems })
        }
    }
}

// ── Validation errors ────────────────────────────────────────────────

/// One thing wrong with a [`SyncConfig`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigProblem {
    #[error("credentials: {field} must not be empty")]
    EmptyCredential { field: &'static str },

    #[error("speed {0} is outside 0.5..=2.0")]
    SpeedOutOfRange(f64),

    #[error("timing: {field} interval must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("timing: max_login_attempts must be at least 1")]
    ZeroLoginAttempts,

    #[error("sensors[{index}]: portal name must not be empty")]
    EmptySensorName { index: usize },

    #[error("sensors[{index}]: display name must not be blank when set")]
    EmptyDisplayName { index: usize },

    #[error("sensors[{index}]: zone {zone} is outside 1..=999")]
    ZoneOutOfRange { index: usize, zone: u32 },

    #[error("sensors[{index}]: duplicates sensors[{first}] (same name, type and zone)")]
    DuplicateSensor { index: usize, first: usize },
}

/// Every problem found by [`SyncConfig::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ConfigError {
    pub problems: Vec<ConfigProblem>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration ({} problem", self.problems.len())?;
        if self.problems.len() != 1 {
            f.write_str("s")?;
        }
        f.write_str(")")?;
        for problem in &self.problems {
            write!(f, "\n  - {problem}")?;
        }
        Ok(())
    }
}
