// ── Device reconciliation ──
//
// Builds the canonical device list from the latest portal payloads and the
// configured sensors. The list is recomputed from scratch on every pass;
// identity comes from `DeviceId`, never from list position.

use std::collections::HashSet;
use std::fmt;

use alarmsync_api::{GatewayInfo, PanelInfo, SensorInfo};
use serde::Serialize;
use tracing::debug;

use crate::config::SensorConfig;
use crate::model::{Device, DeviceCategory, DeviceId, SensorType};

/// A configured sensor with no usable portal counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub portal_name: String,
    pub sensor_type: SensorType,
    pub zone: u32,
    pub reason: MismatchReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchReason {
    /// No portal sensor has this name, type and zone.
    NotReported,
    /// The matching portal sensor was already claimed by an earlier entry.
    AlreadyClaimed,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let why = match self.reason {
            MismatchReason::NotReported => "not reported by the portal",
            MismatchReason::AlreadyClaimed => "already matched by an earlier sensor entry",
        };
        write!(
            f,
            "sensor {:?} ({}, zone {}) {why}",
            self.portal_name, self.sensor_type, self.zone
        )
    }
}

/// Result of one [`unify`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub devices: Vec<Device>,
    /// Configured sensors left out of `devices`.
    pub unmatched: Vec<Mismatch>,
}

/// Compute the canonical device list.
///
/// The gateway and panel are present when their info is known. Each
/// configured sensor is matched against the first portal sensor with the
/// same name, normalized type and zone; unmatched entries are skipped and
/// reported. With no sensor listing yet (`sensors` is `None`) matching is
/// skipped entirely and nothing counts as unmatched.
pub fn unify(
    gateway: Option<&GatewayInfo>,
    panel: Option<&PanelInfo>,
    sensors: Option<&[SensorInfo]>,
    configured: &[SensorConfig],
) -> Reconciliation {
    let mut devices = Vec::with_capacity(configured.len() + 2);
    let mut unmatched = Vec::new();

    if let Some(gw) = gateway {
        devices.push(Device {
            id: DeviceId::gateway(),
            name: "Gateway".into(),
            category: DeviceCategory::Gateway,
            manufacturer: gw.manufacturer.clone(),
            model: gw.model.clone(),
            zone: None,
        });
    }

    if let Some(p) = panel {
        devices.push(Device {
            id: DeviceId::panel(),
            name: "Security Panel".into(),
            category: DeviceCategory::Panel,
            manufacturer: p.manufacturer.clone(),
            model: p.model.clone(),
            zone: None,
        });
    }

    let Some(sensors) = sensors else {
        return Reconciliation { devices, unmatched };
    };

    let mut claimed: HashSet<&str> = HashSet::new();
    for entry in configured {
        let Some(matched) = find_match(entry, sensors) else {
            unmatched.push(mismatch(entry, MismatchReason::NotReported));
            continue;
        };
        if !claimed.insert(matched.device_id.as_str()) {
            unmatched.push(mismatch(entry, MismatchReason::AlreadyClaimed));
            continue;
        }

        devices.push(Device {
            id: DeviceId::sensor(&matched.device_id),
            name: entry
                .display_name
                .clone()
                .unwrap_or_else(|| matched.name.clone()),
            category: DeviceCategory::Sensor(entry.sensor_type),
            manufacturer: panel.and_then(|p| p.manufacturer.clone()),
            model: panel.and_then(|p| p.model.clone()),
            zone: Some(matched.zone),
        });
    }

    Reconciliation { devices, unmatched }
}

/// First portal sensor matching `entry` exactly.
pub fn find_match<'a>(entry: &SensorConfig, sensors: &'a [SensorInfo]) -> Option<&'a SensorInfo> {
    let mut candidates = sensors.iter().filter(|s| {
        s.name == entry.portal_name
            && s.zone == entry.zone
            && SensorType::from_portal_label(&s.device_type) == Some(entry.sensor_type)
    });
    let first = candidates.next()?;
    if candidates.next().is_some() {
        debug!(
            portal_name = %entry.portal_name,
            zone = entry.zone,
            chosen = %first.device_id,
            "several portal sensors match; using the first"
        );
    }
    Some(first)
}

fn mismatch(entry: &SensorConfig, reason: MismatchReason) -> Mismatch {
    Mismatch {
        portal_name: entry.portal_name.clone(),
        sensor_type: entry.sensor_type,
        zone: entry.zone,
        reason,
    }
}
