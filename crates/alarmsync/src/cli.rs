//! Clap derive structures for the `alarmsync` CLI.
//!
//! Also compiled by `build.rs` for man pages, so it depends on nothing but
//! clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// alarmsync -- mirror a security-system portal into a device registry
#[derive(Debug, Parser)]
#[command(
    name = "alarmsync",
    version,
    about = "Keep a security-system portal session alive and mirror its devices",
    long_about = "Signs in to the security-system web portal, keeps the session alive,\n\
        polls for state changes and mirrors the gateway, panel and configured\n\
        sensors into a local device registry.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "ALARMSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ALARMSYNC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Portal base URL override
    #[arg(long, env = "ALARMSYNC_PORTAL_URL", global = true, hide = true)]
    pub portal_url: Option<String>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the sync engine until interrupted
    Run(RunArgs),

    /// Refresh once and list the canonical devices
    #[command(alias = "dev", alias = "d")]
    Devices,

    /// Refresh once and list every sensor the portal reports
    Sensors,

    /// Refresh once and show panel, gateway and session status
    #[command(alias = "st")]
    Status,

    /// Arm the panel
    Arm(ArmArgs),

    /// Disarm the panel
    Disarm,

    /// Manage configuration and stored credentials
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Override the configured start-up mode
    #[arg(long, value_enum)]
    pub mode: Option<RunMode>,

    /// Override the configured speed multiplier (0.5 to 2.0)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Also write logs to a daily rotated file at this path
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RunMode {
    /// Keep the session open and mirror the portal continuously
    Normal,
    /// Sign in once, then schedule nothing
    Paused,
    /// Remove every known device from the registry, then stop
    Reset,
}

// ── Arm ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ArmArgs {
    /// Arm mode
    #[arg(value_enum, default_value = "away")]
    pub mode: ArmMode,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ArmMode {
    Away,
    Stay,
    Night,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration (passwords masked)
    Show,

    /// Print the configuration file path
    Path,

    /// Load and validate the configuration, including the password lookup
    Check,

    /// Store the portal password in the system keyring
    SetPassword,

    /// Remove the portal password from the system keyring
    ClearPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
