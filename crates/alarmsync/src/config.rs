//! CLI configuration: a thin layer over `alarmsync_config` that honours
//! `--config` and the hidden `--portal-url` override.

use std::path::PathBuf;
use std::sync::Arc;

use alarmsync_api::{HttpPortal, Portal, TransportConfig};
use alarmsync_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use alarmsync_config::{Account, Config, config_path, save_config};

/// The file `--config` points at, or the canonical one.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(alarmsync_config::load_config(global.config.as_deref())?)
}

/// Everything a portal-bound command needs.
pub struct Resolved {
    pub sync: SyncConfig,
    pub portal: Arc<dyn Portal>,
}

/// Load the file, resolve the password, validate, and build the HTTP
/// portal client.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load(global)?;
    resolve_from(&cfg, global)
}

pub fn resolve_from(cfg: &Config, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let sync = cfg.to_sync_config()?;
    let transport = TransportConfig::default().with_timeout(cfg.request_timeout()?);

    let portal = match global.portal_url.as_deref() {
        Some(raw) => {
            let url = raw.parse().map_err(|e| CliError::Validation {
                field: "portal-url".into(),
                reason: format!("{e}"),
            })?;
            HttpPortal::with_base_url(url, &transport)?
        }
        None => HttpPortal::new(sync.subdomain, &transport)?,
    };

    tracing::debug!(portal = %portal.base_url(), sensors = sync.sensors.len(), "configuration resolved");
    Ok(Resolved {
        sync,
        portal: Arc::new(portal),
    })
}
