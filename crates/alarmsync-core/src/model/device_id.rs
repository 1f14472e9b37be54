// ── Stable device identity ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier that survives reconciliation passes and config reordering.
///
/// Only three shapes exist: the site's gateway, its panel, and one id per
/// portal sensor keyed by the portal's own device id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn gateway() -> Self {
        Self("gateway".into())
    }

    pub fn panel() -> Self {
        Self("panel".into())
    }

    pub fn sensor(portal_device_id: &str) -> Self {
        Self(format!("sensor-{portal_device_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
