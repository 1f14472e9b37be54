//! `run`: the long-running sync engine.
//!
//! Hosts an in-memory device registry and a logging detection sink; both
//! report what the engine does through `tracing`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use alarmsync_core::{
    Controller, MemoryRegistry, RegistryAdapter, SyncMode, TracingSink,
};

use crate::cli::{GlobalOpts, RunArgs, RunMode};
use crate::config;
use crate::error::CliError;

fn sync_mode(mode: RunMode) -> SyncMode {
    match mode {
        RunMode::Normal => SyncMode::Normal,
        RunMode::Paused => SyncMode::Paused,
        RunMode::Reset => SyncMode::Reset,
    }
}

/// Log session transitions and device list updates until aborted.
fn spawn_watchers(controller: &Controller) -> JoinHandle<()> {
    let mut session = controller.session_state();
    let mut devices = controller.devices();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                changed = session.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = *session.borrow_and_update();
                    info!(?state, "session state changed");
                }
                changed = devices.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let count = devices.borrow_and_update().len();
                    info!(count, "device list updated");
                }
            }
        }
    })
}

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut cfg = config::load(global)?;
    if let Some(mode) = args.mode {
        cfg.sync.mode = sync_mode(mode);
    }
    if let Some(speed) = args.speed {
        cfg.sync.speed = speed;
    }

    let resolved = config::resolve_from(&cfg, global)?;
    let mode = resolved.sync.mode;
    let registry = Arc::new(MemoryRegistry::new());
    let controller = Controller::new(
        resolved.sync,
        resolved.portal,
        RegistryAdapter::new(registry.clone()),
        Arc::new(TracingSink),
    )?;

    let watchers = spawn_watchers(&controller);
    controller.start().await?;

    if mode == SyncMode::Normal {
        if !global.quiet {
            eprintln!("alarmsync running; press Ctrl-C to stop");
        }
        tokio::signal::ctrl_c().await?;
        info!("interrupt received, shutting down");
    }

    controller.shutdown().await;
    watchers.abort();

    if !global.quiet {
        eprintln!(
            "✓ Stopped ({mode} mode); {} devices registered",
            registry.snapshot().len()
        );
    }
    Ok(())
}
