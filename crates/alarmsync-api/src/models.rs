// Portal payload types
//
// Shapes of the resources the portal exposes. Field names follow the
// portal's camelCase JSON; everything optional on the wire is optional here.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::Error;

/// Returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Portal build, taken from the `/myhome/<version>/` path segment.
    pub portal_version: String,
}

/// Hardware and connectivity report for the site's gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub hardware_version: Option<String>,
    pub primary_connection: Option<String>,
    pub broadband_status: Option<String>,
    pub cellular_status: Option<String>,
    pub battery_status: Option<String>,
}

/// Static description of the security panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelInfo {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub emergency_keys: Vec<String>,
}

/// Arm state reported by, and requested from, the panel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ArmState {
    Away,
    Stay,
    Night,
    /// Disarmed.
    #[strum(to_string = "off", serialize = "disarmed")]
    #[serde(alias = "disarmed")]
    Off,
    #[serde(other)]
    Unknown,
}

impl ArmState {
    pub fn is_armed(self) -> bool {
        matches!(self, Self::Away | Self::Stay | Self::Night)
    }

    /// Whether the panel accepts a change from `self` to `target`.
    ///
    /// A disarmed panel may be armed in any mode; an armed panel may only be
    /// disarmed. Re-requesting the current state, switching directly between
    /// armed modes, and anything involving `Unknown` are rejected.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Off, t) => t.is_armed(),
            (s, Self::Off) => s.is_armed(),
            _ => false,
        }
    }

    /// Validate a transition, producing the portal error on rejection.
    pub fn validate_transition(self, target: Self) -> Result<(), Error> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(Error::InvalidStateTransition {
                from: self,
                to: target,
            })
        }
    }
}

/// Live panel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelStatus {
    pub state: ArmState,
    /// Free-form status line, e.g. `"All Quiet"` or `"Sensor Problem"`.
    #[serde(default)]
    pub status: Option<String>,
}

/// One sensor as listed on the portal's system page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorInfo {
    /// The portal's own identifier for the device.
    pub device_id: String,
    pub name: String,
    pub zone: u32,
    /// Comma-separated type label, e.g. `"sensor,doorWindow"`.
    pub device_type: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// One sensor's live state from the portal's status orb.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorStatus {
    pub name: String,
    pub zone: u32,
    /// e.g. `"Closed"`, `"Open"`, `"Motion"`, `"Tripped"`.
    pub state: String,
}
