//! CLI error types with miette diagnostics.
//!
//! Maps engine and configuration errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use alarmsync_config::ConfigError;
use alarmsync_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const REJECTED: i32 = 5;
    pub const CONNECTION: i32 = 6;
    pub const TIMEOUT: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("No portal account configured")]
    #[diagnostic(
        code(alarmsync::no_config),
        help(
            "Create a configuration with: alarmsync config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(alarmsync::config_not_found),
        help("Check the --config path, or create one with: alarmsync config init --config {path}")
    )]
    ConfigNotFound { path: String },

    #[error("No password available for '{username}'")]
    #[diagnostic(
        code(alarmsync::no_password),
        help(
            "Store one with: alarmsync config set-password\n\
             Or set the ALARMSYNC_PASSWORD environment variable."
        )
    )]
    NoPassword { username: String },

    #[error("{0}")]
    #[diagnostic(
        code(alarmsync::invalid_config),
        help("Fix the listed settings and run: alarmsync config check")
    )]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(alarmsync::config))]
    Config(String),

    // ── Session ──────────────────────────────────────────────────────
    #[error("Portal sign-in failed: {message}")]
    #[diagnostic(
        code(alarmsync::auth_failed),
        help(
            "Verify the username, password and fingerprint.\n\
             The fingerprint comes from the browser that completed two-factor enrollment."
        )
    )]
    AuthFailed { message: String },

    #[error("Sign-in suspended after repeated failures")]
    #[diagnostic(
        code(alarmsync::cooling_down),
        help("Wait {remaining_secs}s before trying again.")
    )]
    CoolingDown { remaining_secs: u64 },

    // ── Connectivity ─────────────────────────────────────────────────
    #[error("Could not reach the portal: {reason}")]
    #[diagnostic(
        code(alarmsync::connection_failed),
        help("Check network connectivity and the configured subdomain.")
    )]
    ConnectionFailed { reason: String },

    #[error("Portal request timed out")]
    #[diagnostic(
        code(alarmsync::timeout),
        help("Increase sync.timeout in the configuration file.")
    )]
    Timeout,

    #[error("Unexpected portal response: {message}")]
    #[diagnostic(code(alarmsync::unexpected_response))]
    UnexpectedResponse { message: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Cannot change panel state from '{from}' to '{to}'")]
    #[diagnostic(
        code(alarmsync::invalid_transition),
        help("The panel must be disarmed before arming, and armed before disarming.")
    )]
    InvalidTransition { from: String, to: String },

    #[error("Panel state is unknown")]
    #[diagnostic(
        code(alarmsync::panel_state_unknown),
        help("The portal did not report the panel status; try again shortly.")
    )]
    PanelStateUnknown,

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(alarmsync::validation))]
    Validation { field: String, reason: String },

    // ── Internal / IO ────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(code(alarmsync::internal))]
    Internal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(alarmsync::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. }
            | Self::ConfigNotFound { .. }
            | Self::InvalidConfig(_)
            | Self::Config(_) => exit_code::CONFIG,
            Self::AuthFailed { .. } | Self::CoolingDown { .. } | Self::NoPassword { .. } => {
                exit_code::AUTH
            }
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::InvalidTransition { .. } | Self::PanelStateUnknown => exit_code::REJECTED,
            Self::Validation { .. } => exit_code::USAGE,
            Self::UnexpectedResponse { .. } | Self::Internal(_) | Self::Io(_) | Self::Render(_) => {
                exit_code::GENERAL
            }
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::SessionInvalidated | CoreError::NotAuthenticated => Self::AuthFailed {
                message: "the portal session ended unexpectedly".into(),
            },
            CoreError::CoolingDown { remaining_secs } => Self::CoolingDown { remaining_secs },
            CoreError::ConnectionFailed { reason } => Self::ConnectionFailed { reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::UnexpectedResponse { message } => Self::UnexpectedResponse { message },
            CoreError::InvalidStateTransition { from, to } => Self::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            CoreError::PanelStatusUnknown => Self::PanelStateUnknown,
            CoreError::InvalidConfig(e) => Self::InvalidConfig(e.to_string()),
            CoreError::Registry(e) => Self::Internal(e.to_string()),
            CoreError::AlreadyStarted | CoreError::Internal(_) => Self::Internal(err.to_string()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { field: "account" } => Self::NoConfig {
                path: alarmsync_config::config_path().display().to_string(),
            },
            ConfigError::NotFound { path } => Self::ConfigNotFound {
                path: path.display().to_string(),
            },
            ConfigError::NoPassword { username } => Self::NoPassword { username },
            ConfigError::Invalid(e) => Self::InvalidConfig(e.to_string()),
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(e) => Self::Io(e),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<alarmsync_api::Error> for CliError {
    fn from(err: alarmsync_api::Error) -> Self {
        CoreError::from(err).into()
    }
}
