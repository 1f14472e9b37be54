// ── Device records ──

use std::fmt;

use serde::{Deserialize, Serialize};

use super::device_id::DeviceId;
use super::sensor_type::SensorType;

/// What kind of thing a device record stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "sensorType", rename_all = "camelCase")]
pub enum DeviceCategory {
    Gateway,
    Panel,
    Sensor(SensorType),
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gateway => f.write_str("gateway"),
            Self::Panel => f.write_str("panel"),
            Self::Sensor(kind) => write!(f, "sensor ({kind})"),
        }
    }
}

/// One entry of the canonical device list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub category: DeviceCategory,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Alarm zone, sensors only.
    pub zone: Option<u32>,
}

impl Device {
    pub fn is_sensor(&self) -> bool {
        matches!(self.category, DeviceCategory::Sensor(_))
    }
}
