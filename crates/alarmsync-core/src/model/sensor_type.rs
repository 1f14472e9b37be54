// ── Sensor type normalization ──
//
// The portal labels devices with a comma-separated type list such as
// "sensor,doorWindow", and on some pages with a long human label such as
// "Door/Window Sensor". Both collapse to one `SensorType`.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Sensor kinds the engine knows how to expose.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase", ascii_case_insensitive)]
pub enum SensorType {
    /// Carbon monoxide.
    Co,
    DoorWindow,
    Fire,
    Flood,
    Glass,
    Heat,
    Keypad,
    Motion,
    Panic,
    Shock,
    Temperature,
    Unknown,
}

impl SensorType {
    /// Normalize a portal `device_type` label.
    ///
    /// Takes the last non-empty comma-separated segment and parses it
    /// case-insensitively, falling back to the portal's long labels.
    /// Unrecognized labels give `None`.
    pub fn from_portal_label(label: &str) -> Option<Self> {
        let segment = label
            .split(',')
            .map(str::trim)
            .rfind(|s| !s.is_empty())?;
        segment
            .parse()
            .ok()
            .or_else(|| Self::from_long_label(segment))
    }

    fn from_long_label(label: &str) -> Option<Self> {
        let kind = match label.to_ascii_lowercase().as_str() {
            "carbon monoxide detector" | "co detector" => Self::Co,
            "door/window sensor" | "door sensor" | "window sensor" => Self::DoorWindow,
            "fire (smoke/heat) detector" | "smoke detector" | "smoke/heat detector" => Self::Fire,
            "water/flood sensor" | "flood sensor" | "water sensor" => Self::Flood,
            "glass break detector" => Self::Glass,
            "heat (rate-of-rise) detector" | "heat detector" => Self::Heat,
            "keypad/touchpad" | "keypad" => Self::Keypad,
            "motion sensor" | "motion sensor (notable events only)" => Self::Motion,
            "audible panic button/pendant" | "silent panic button/pendant" | "panic button" => {
                Self::Panic
            }
            "shock sensor" => Self::Shock,
            "temperature sensor" => Self::Temperature,
            "unknown device type" => Self::Unknown,
            _ => return None,
        };
        Some(kind)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn last_segment_wins() {
        assert_eq!(
            SensorType::from_portal_label("sensor,doorWindow"),
            Some(SensorType::DoorWindow)
        );
        assert_eq!(
            SensorType::from_portal_label("sensor, motion ,"),
            Some(SensorType::Motion)
        );
        assert_eq!(SensorType::from_portal_label("co"), Some(SensorType::Co));
    }

    #[test]
    fn parsing_is_case_insensitive() {
        assert_eq!(
            SensorType::from_portal_label("sensor,DOORWINDOW"),
            Some(SensorType::DoorWindow)
        );
        assert_eq!(SensorType::from_portal_label("Glass"), Some(SensorType::Glass));
    }

    #[test]
    fn long_labels_are_aliases() {
        assert_eq!(
            SensorType::from_portal_label("Door/Window Sensor"),
            Some(SensorType::DoorWindow)
        );
        assert_eq!(
            SensorType::from_portal_label("Carbon Monoxide Detector"),
            Some(SensorType::Co)
        );
        assert_eq!(
            SensorType::from_portal_label("Fire (Smoke/Heat) Detector"),
            Some(SensorType::Fire)
        );
    }

    #[test]
    fn unrecognized_labels_normalize_to_none() {
        assert_eq!(SensorType::from_portal_label("sensor,camera"), None);
        assert_eq!(SensorType::from_portal_label(""), None);
        assert_eq!(SensorType::from_portal_label(",,"), None);
    }

    #[test]
    fn display_matches_config_spelling() {
        assert_eq!(SensorType::DoorWindow.to_string(), "doorWindow");
        assert_eq!(SensorType::Co.to_string(), "co");
        let parsed: SensorType = serde_json::from_str("\"doorWindow\"").unwrap();
        assert_eq!(parsed, SensorType::DoorWindow);
    }
}
