//! Command dispatch: bridges CLI args -> engine -> output formatting.

pub mod arm;
pub mod config_cmd;
pub mod devices;
pub mod run;
pub mod sensors;
pub mod status;

use alarmsync_core::{Controller, CoreError};

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a one-shot, portal-bound command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Devices => devices::handle(global).await,
        Command::Sensors => sensors::handle(global).await,
        Command::Status => status::handle(global).await,
        Command::Arm(args) => arm::handle(arm::target(args.mode), global).await,
        Command::Disarm => arm::handle(alarmsync_api::ArmState::Off, global).await,
        Command::Run(_) | Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command is handled before dispatch".into(),
        )),
    }
}

/// Sign in, refresh once, run `f` against the populated controller, sign
/// out.
pub async fn with_refreshed<F, T>(global: &GlobalOpts, f: F) -> Result<T, CliError>
where
    F: FnOnce(&Controller) -> Result<T, CoreError>,
{
    let resolved = config::resolve(global)?;
    let value = Controller::oneshot(resolved.sync, resolved.portal, |controller| async move {
        let report = controller.refresh().await;
        if !report.failed.is_empty() {
            tracing::warn!(failed = ?report.failed, "some portal resources could not be fetched");
        }
        f(&controller)
    })
    .await?;
    Ok(value)
}
