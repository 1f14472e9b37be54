//! Configuration for alarmsync.
//!
//! TOML file + `ALARMSYNC_*` environment overrides, password resolution
//! (env, then keyring, then plaintext), and translation to
//! `alarmsync_core::SyncConfig`. The CLI layers its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use alarmsync_api::{Credentials, Subdomain};
use alarmsync_core::{SensorConfig, SensorType, SyncConfig, SyncMode, Timing};

/// Prefix of environment variables merged over the file.
pub const ENV_PREFIX: &str = "ALARMSYNC_";

/// Environment variable consulted first for the portal password.
pub const PASSWORD_ENV: &str = "ALARMSYNC_PASSWORD";

/// Keyring service name; entries are keyed `<username>/password`.
pub const KEYRING_SERVICE: &str = "alarmsync";

const REDACTED: &str = "********";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("missing required setting '{field}'")]
    Missing { field: &'static str },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password available for '{username}'")]
    NoPassword { username: String },

    #[error(transparent)]
    Invalid(#[from] alarmsync_core::ConfigError),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Portal account. Required by every command that talks to the portal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Account>,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub timing: TimingSection,

    /// Sensors expected on the portal.
    #[serde(default)]
    pub sensors: Vec<SensorEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Account {
    #[serde(default)]
    pub username: String,

    /// Plaintext password (prefer keyring or `ALARMSYNC_PASSWORD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Browser fingerprint issued at two-factor enrollment.
    #[serde(default)]
    pub fingerprint: String,

    #[serde(default)]
    pub subdomain: Subdomain,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SyncSection {
    #[serde(default)]
    pub mode: SyncMode,

    /// Interval divisor, 0.5 to 2.0.
    #[serde(default = "default_speed")]
    pub speed: f64,

    /// Portal request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            mode: SyncMode::default(),
            speed: default_speed(),
            timeout: default_timeout(),
        }
    }
}

fn default_speed() -> f64 {
    1.0
}
fn default_timeout() -> u64 {
    30
}

/// Base pacing, in seconds, before the speed multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingSection {
    pub tick: u64,
    pub heartbeat: u64,
    pub change_check: u64,
    pub login_cooldown: u64,
    pub max_login_attempts: u32,
}

impl Default for TimingSection {
    fn default() -> Self {
        let timing = Timing::default();
        Self {
            tick: timing.tick.as_secs(),
            heartbeat: timing.heartbeat.as_secs(),
            change_check: timing.change_check.as_secs(),
            login_cooldown: timing.login_cooldown.as_secs(),
            max_login_attempts: timing.max_login_attempts,
        }
    }
}

impl From<&TimingSection> for Timing {
    fn from(t: &TimingSection) -> Self {
        Self {
            tick: Duration::from_secs(t.tick),
            heartbeat: Duration::from_secs(t.heartbeat),
            change_check: Duration::from_secs(t.change_check),
            login_cooldown: Duration::from_secs(t.login_cooldown),
            max_login_attempts: t.max_login_attempts,
        }
    }
}

/// A `[[sensors]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SensorEntry {
    /// Sensor name exactly as the portal reports it.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(rename = "type")]
    pub sensor_type: SensorType,

    pub zone: u32,
}

impl From<&SensorEntry> for SensorConfig {
    fn from(entry: &SensorEntry) -> Self {
        Self {
            display_name: entry.display_name.clone(),
            portal_name: entry.name.clone(),
            sensor_type: entry.sensor_type,
            zone: entry.zone,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "alarmsync", "alarmsync").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("alarmsync");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load config from `path` (or the canonical path) merged with the
/// environment.
///
/// An explicit path must exist; a missing canonical file just yields the
/// defaults plus whatever the environment sets.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::NotFound {
                path: p.to_path_buf(),
            });
        }
        Some(p) => p.to_path_buf(),
        None => config_path(),
    };

    debug!(path = %path.display(), "loading configuration");
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent
/// directories.
pub fn save_config(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Password resolution ─────────────────────────────────────────────

fn keyring_entry(username: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{username}/password"))?)
}

fn keyring_password(username: &str) -> Option<String> {
    let entry = keyring_entry(username).ok()?;
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            debug!(error = %e, "keyring lookup failed");
            None
        }
    }
}

/// Resolve the portal password: `ALARMSYNC_PASSWORD`, then the system
/// keyring, then the plaintext `password` in the file.
pub fn resolve_password(account: &Account) -> Result<SecretString, ConfigError> {
    let from_env = std::env::var(PASSWORD_ENV).ok();
    pick_password(
        &account.username,
        from_env,
        || keyring_password(&account.username),
        account.password.as_deref(),
    )
}

fn pick_password(
    username: &str,
    from_env: Option<String>,
    from_keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&str>,
) -> Result<SecretString, ConfigError> {
    if let Some(pw) = from_env.filter(|p| !p.is_empty()) {
        debug!("password taken from environment");
        return Ok(SecretString::from(pw));
    }
    if let Some(pw) = from_keyring().filter(|p| !p.is_empty()) {
        debug!("password taken from keyring");
        return Ok(SecretString::from(pw));
    }
    if let Some(pw) = plaintext.filter(|p| !p.is_empty()) {
        return Ok(SecretString::from(pw.to_owned()));
    }
    Err(ConfigError::NoPassword {
        username: username.into(),
    })
}

/// Store `password` in the system keyring for `username`.
pub fn store_password(username: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(username)?.set_password(password)?;
    Ok(())
}

/// Remove the keyring entry for `username`. A missing entry is not an error.
pub fn delete_password(username: &str) -> Result<(), ConfigError> {
    match keyring_entry(username)?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    pub fn account(&self) -> Result<&Account, ConfigError> {
        self.account
            .as_ref()
            .ok_or(ConfigError::Missing { field: "account" })
    }

    /// Portal request timeout.
    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        if self.sync.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "sync.timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(Duration::from_secs(self.sync.timeout))
    }

    /// Resolve the password and build a validated `SyncConfig`.
    pub fn to_sync_config(&self) -> Result<SyncConfig, ConfigError> {
        let account = self.account()?;
        let password = resolve_password(account)?;
        self.build_sync_config(password)
    }

    /// Build a validated `SyncConfig` with an already resolved password.
    pub fn build_sync_config(&self, password: SecretString) -> Result<SyncConfig, ConfigError> {
        let account = self.account()?;

        let mut config = SyncConfig::new(Credentials {
            username: account.username.clone(),
            password,
            fingerprint: account.fingerprint.clone(),
        });
        config.subdomain = account.subdomain;
        config.mode = self.sync.mode;
        config.speed = self.sync.speed;
        config.timing = Timing::from(&self.timing);
        config.sensors = self.sensors.iter().map(SensorConfig::from).collect();

        config.validate()?;
        Ok(config)
    }

    /// Copy safe to print: any plaintext password is masked.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if let Some(account) = cfg.account.as_mut() {
            if account.password.is_some() {
                account.password = Some(REDACTED.into());
            }
        }
        cfg
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn account() -> Account {
        Account {
            username: "owner@example.com".into(),
            password: Some("from-file".into()),
            fingerprint: "fp-123".into(),
            subdomain: Subdomain::PortalCa,
        }
    }

    #[test]
    fn env_wins_over_keyring_and_file() {
        let pw = pick_password(
            "owner",
            Some("from-env".into()),
            || Some("from-keyring".into()),
            Some("from-file"),
        )
        .unwrap();
        assert_eq!(pw.expose_secret(), "from-env");
    }

    #[test]
    fn keyring_wins_over_file() {
        let pw = pick_password("owner", None, || Some("from-keyring".into()), Some("from-file"))
            .unwrap();
        assert_eq!(pw.expose_secret(), "from-keyring");
    }

    #[test]
    fn empty_sources_are_skipped() {
        let pw = pick_password("owner", Some(String::new()), || None, Some("from-file")).unwrap();
        assert_eq!(pw.expose_secret(), "from-file");

        let err = pick_password("owner", None, || None, Some("")).unwrap_err();
        assert!(matches!(err, ConfigError::NoPassword { username } if username == "owner"));
    }

    #[test]
    fn translates_to_sync_config() {
        let cfg = Config {
            account: Some(account()),
            sync: SyncSection {
                mode: SyncMode::Paused,
                speed: 2.0,
                timeout: 10,
            },
            timing: TimingSection {
                heartbeat: 120,
                ..TimingSection::default()
            },
            sensors: vec![SensorEntry {
                name: "Front Door".into(),
                display_name: Some("Entry".into()),
                sensor_type: SensorType::DoorWindow,
                zone: 3,
            }],
        };

        let sync = cfg.build_sync_config(SecretString::from("pw")).unwrap();

        assert_eq!(sync.subdomain, Subdomain::PortalCa);
        assert_eq!(sync.mode, SyncMode::Paused);
        assert_eq!(sync.heartbeat_interval(), Duration::from_secs(60));
        assert_eq!(sync.credentials.fingerprint, "fp-123");
        assert_eq!(
            sync.sensors,
            vec![SensorConfig {
                display_name: Some("Entry".into()),
                portal_name: "Front Door".into(),
                sensor_type: SensorType::DoorWindow,
                zone: 3,
            }]
        );
        assert_eq!(cfg.request_timeout().unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn missing_account_is_reported() {
        let err = Config::default()
            .build_sync_config(SecretString::from("pw"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "account" }));
    }

    #[test]
    fn core_validation_problems_surface() {
        let cfg = Config {
            account: Some(Account {
                fingerprint: String::new(),
                ..account()
            }),
            sensors: vec![SensorEntry {
                name: "Hall".into(),
                display_name: None,
                sensor_type: SensorType::Motion,
                zone: 1000,
            }],
            ..Config::default()
        };

        let err = cfg.build_sync_config(SecretString::from("pw")).unwrap_err();
        let ConfigError::Invalid(invalid) = &err else {
            panic!("expected validation failure, got {err:?}");
        };
        assert_eq!(invalid.problems.len(), 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = Config::default();
        cfg.sync.timeout = 0;
        assert!(matches!(
            cfg.request_timeout(),
            Err(ConfigError::Validation { field, .. }) if field == "sync.timeout"
        ));
    }

    #[test]
    fn redaction_masks_plaintext_password() {
        let cfg = Config {
            account: Some(account()),
            ..Config::default()
        };
        let shown = cfg.redacted();
        assert_eq!(shown.account.unwrap().password.as_deref(), Some(REDACTED));

        let no_pw = Config {
            account: Some(Account {
                password: None,
                ..account()
            }),
            ..Config::default()
        };
        assert_eq!(no_pw.redacted().account.unwrap().password, None);
    }
}
