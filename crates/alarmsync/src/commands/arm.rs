//! `arm` / `disarm`: change the panel state.
//!
//! The engine only knows the current state after a refresh, so the command
//! refreshes first, then sends the transition.

use alarmsync_api::ArmState;
use alarmsync_core::Controller;

use crate::cli::{ArmMode, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub fn target(mode: ArmMode) -> ArmState {
    match mode {
        ArmMode::Away => ArmState::Away,
        ArmMode::Stay => ArmState::Stay,
        ArmMode::Night => ArmState::Night,
    }
}

pub async fn handle(target: ArmState, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;

    let previous = Controller::oneshot(resolved.sync, resolved.portal, |controller| async move {
        controller.refresh().await;
        let previous = controller.panel_status().map(|s| s.state);
        controller.set_panel_status(target).await?;
        Ok(previous)
    })
    .await?;

    if !global.quiet {
        let from = previous.map_or_else(|| "unknown".into(), |s| s.to_string());
        eprintln!("✓ Panel change requested: {from} → {target}");
    }
    Ok(())
}
