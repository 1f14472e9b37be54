// ── Change detection ──
//
// Every payload fetched from the portal passes through here. Each one is
// hashed; a hash that was already surfaced is dropped silently. Otherwise a
// per-resource assessor compares it with the last surfaced payload of the
// same kind and decides whether anything worth reporting changed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use alarmsync_api::{
    ArmState, GatewayInfo, PanelInfo, PanelStatus, SensorInfo, SensorStatus, SessionInfo,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use strum::Display;
use tracing::{debug, info, warn};

// ── Observations ─────────────────────────────────────────────────

/// The portal resources the engine observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceKind {
    Session,
    Gateway,
    Panel,
    PanelStatus,
    SensorsInfo,
    SensorsStatus,
}

/// One observed payload, tagged with its resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Observation {
    Session(SessionInfo),
    Gateway(GatewayInfo),
    Panel(PanelInfo),
    PanelStatus(PanelStatus),
    SensorsInfo(Vec<SensorInfo>),
    SensorsStatus(Vec<SensorStatus>),
}

impl Observation {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Session(_) => ResourceKind::Session,
            Self::Gateway(_) => ResourceKind::Gateway,
            Self::Panel(_) => ResourceKind::Panel,
            Self::PanelStatus(_) => ResourceKind::PanelStatus,
            Self::SensorsInfo(_) => ResourceKind::SensorsInfo,
            Self::SensorsStatus(_) => ResourceKind::SensorsStatus,
        }
    }

    /// Hex SHA-256 of the tagged JSON encoding.
    fn content_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

/// Why an observation is newsworthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionReason {
    /// No earlier observation of this kind was surfaced.
    FirstSeen,
    PortalVersionChanged { from: String, to: String },
    /// Identity fields (firmware, model, serial...) differ.
    DetailsChanged { fields: Vec<&'static str> },
    ArmStateChanged { from: ArmState, to: ArmState },
    StatusTextChanged {
        from: Option<String>,
        to: Option<String>,
    },
    /// Portal device ids that appeared or disappeared.
    SensorsChanged {
        added: Vec<String>,
        removed: Vec<String>,
    },
    /// `(name, zone)` of sensors whose state differs.
    SensorStatesChanged { sensors: Vec<(String, u32)> },
}

impl fmt::Display for DetectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSeen => f.write_str("first seen"),
            Self::PortalVersionChanged { from, to } => {
                write!(f, "portal version changed from {from} to {to}")
            }
            Self::DetailsChanged { fields } => write!(f, "{} changed", fields.join(", ")),
            Self::ArmStateChanged { from, to } => write!(f, "arm state changed from {from} to {to}"),
            Self::StatusTextChanged { from, to } => write!(
                f,
                "status changed from {:?} to {:?}",
                from.as_deref().unwrap_or(""),
                to.as_deref().unwrap_or("")
            ),
            Self::SensorsChanged { added, removed } => write!(
                f,
                "sensors added [{}], removed [{}]",
                added.join(", "),
                removed.join(", ")
            ),
            Self::SensorStatesChanged { sensors } => {
                let names: Vec<String> = sensors
                    .iter()
                    .map(|(name, zone)| format!("{name} (zone {zone})"))
                    .collect();
                write!(f, "state changed for {}", names.join(", "))
            }
        }
    }
}

// ── Sink ─────────────────────────────────────────────────────────

/// Receives every observation that was not already surfaced.
///
/// `reason` is `None` for observations that are new content but not
/// newsworthy. Purely observational; called with the detector locked, so
/// implementations must not call back into the detector.
pub trait DetectionSink: Send + Sync {
    fn detected(&self, observation: &Observation, reason: Option<&DetectionReason>);
}

/// Sink that logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DetectionSink for TracingSink {
    fn detected(&self, observation: &Observation, reason: Option<&DetectionReason>) {
        match reason {
            Some(reason) => info!(resource = %observation.kind(), %reason, "portal change detected"),
            None => debug!(resource = %observation.kind(), "new payload, nothing newsworthy"),
        }
    }
}

// ── ChangeDetector ───────────────────────────────────────────────

pub struct ChangeDetector {
    sink: Arc<dyn DetectionSink>,
    state: Mutex<DetectorState>,
}

#[derive(Default)]
struct DetectorState {
    reported: HashSet<String>,
    last_surfaced: HashMap<ResourceKind, Observation>,
}

impl ChangeDetector {
    pub fn new(sink: Arc<dyn DetectionSink>) -> Self {
        Self {
            sink,
            state: Mutex::new(DetectorState::default()),
        }
    }

    /// Surface `observation` unless identical content was surfaced before.
    ///
    /// Returns `true` when the observation was newsworthy.
    pub fn notify_if_new(&self, observation: Observation) -> bool {
        let hash = match observation.content_hash() {
            Ok(hash) => hash,
            Err(e) => {
                warn!(resource = %observation.kind(), error = %e, "cannot hash observation");
                return false;
            }
        };

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.reported.contains(&hash) {
            return false;
        }

        let kind = observation.kind();
        let reason = assess(state.last_surfaced.get(&kind), &observation);
        self.sink.detected(&observation, reason.as_ref());

        if reason.is_some() {
            state.reported.insert(hash);
            state.last_surfaced.insert(kind, observation);
            true
        } else {
            false
        }
    }

    /// Number of distinct payloads surfaced so far.
    pub fn reported_count(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reported
            .len()
    }
}

// ── Assessors ────────────────────────────────────────────────────

fn assess(previous: Option<&Observation>, next: &Observation) -> Option<DetectionReason> {
    let Some(previous) = previous else {
        return Some(DetectionReason::FirstSeen);
    };
    match (previous, next) {
        (Observation::Session(a), Observation::Session(b)) => assess_session(a, b),
        (Observation::Gateway(a), Observation::Gateway(b)) => assess_gateway(a, b),
        (Observation::Panel(a), Observation::Panel(b)) => assess_panel(a, b),
        (Observation::PanelStatus(a), Observation::PanelStatus(b)) => assess_panel_status(a, b),
        (Observation::SensorsInfo(a), Observation::SensorsInfo(b)) => assess_sensors_info(a, b),
        (Observation::SensorsStatus(a), Observation::SensorsStatus(b)) => {
            assess_sensors_status(a, b)
        }
        _ => Some(DetectionReason::FirstSeen),
    }
}

fn assess_session(prev: &SessionInfo, next: &SessionInfo) -> Option<DetectionReason> {
    (prev.portal_version != next.portal_version).then(|| DetectionReason::PortalVersionChanged {
        from: prev.portal_version.clone(),
        to: next.portal_version.clone(),
    })
}

fn assess_gateway(prev: &GatewayInfo, next: &GatewayInfo) -> Option<DetectionReason> {
    changed_fields(&[
        ("firmware", prev.firmware_version != next.firmware_version),
        ("hardware", prev.hardware_version != next.hardware_version),
        ("model", prev.model != next.model),
        ("serial", prev.serial_number != next.serial_number),
    ])
}

fn assess_panel(prev: &PanelInfo, next: &PanelInfo) -> Option<DetectionReason> {
    changed_fields(&[
        ("manufacturer", prev.manufacturer != next.manufacturer),
        ("model", prev.model != next.model),
    ])
}

fn changed_fields(checks: &[(&'static str, bool)]) -> Option<DetectionReason> {
    let fields: Vec<&'static str> = checks
        .iter()
        .filter(|(_, changed)| *changed)
        .map(|(name, _)| *name)
        .collect();
    (!fields.is_empty()).then_some(DetectionReason::DetailsChanged { fields })
}

fn assess_panel_status(prev: &PanelStatus, next: &PanelStatus) -> Option<DetectionReason> {
    if prev.state != next.state {
        return Some(DetectionReason::ArmStateChanged {
            from: prev.state,
            to: next.state,
        });
    }
    (prev.status != next.status).then(|| DetectionReason::StatusTextChanged {
        from: prev.status.clone(),
        to: next.status.clone(),
    })
}

fn assess_sensors_info(prev: &[SensorInfo], next: &[SensorInfo]) -> Option<DetectionReason> {
    let before: HashSet<&str> = prev.iter().map(|s| s.device_id.as_str()).collect();
    let after: HashSet<&str> = next.iter().map(|s| s.device_id.as_str()).collect();

    let mut added: Vec<String> = after.difference(&before).map(|s| (*s).to_owned()).collect();
    let mut removed: Vec<String> = before.difference(&after).map(|s| (*s).to_owned()).collect();
    if added.is_empty() && removed.is_empty() {
        return None;
    }
    added.sort();
    removed.sort();
    Some(DetectionReason::SensorsChanged { added, removed })
}

fn assess_sensors_status(prev: &[SensorStatus], next: &[SensorStatus]) -> Option<DetectionReason> {
    let before: HashMap<(&str, u32), &str> = prev
        .iter()
        .map(|s| ((s.name.as_str(), s.zone), s.state.as_str()))
        .collect();

    let sensors: Vec<(String, u32)> = next
        .iter()
        .filter(|s| before.get(&(s.name.as_str(), s.zone)) != Some(&s.state.as_str()))
        .map(|s| (s.name.clone(), s.zone))
        .collect();
    (!sensors.is_empty()).then_some(DetectionReason::SensorStatesChanged { sensors })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Records every sink call.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(ResourceKind, Option<DetectionReason>)>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(ResourceKind, Option<DetectionReason>)> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }
    }

    impl DetectionSink for Recorder {
        fn detected(&self, observation: &Observation, reason: Option<&DetectionReason>) {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((observation.kind(), reason.cloned()));
        }
    }

    fn detector() -> (ChangeDetector, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (ChangeDetector::new(recorder.clone()), recorder)
    }

    fn gateway(firmware: &str, broadband: &str) -> Observation {
        Observation::Gateway(GatewayInfo {
            model: Some("PGZNG1".into()),
            firmware_version: Some(firmware.into()),
            broadband_status: Some(broadband.into()),
            ..GatewayInfo::default()
        })
    }

    fn status(name: &str, zone: u32, state: &str) -> SensorStatus {
        SensorStatus {
            name: name.into(),
            zone,
            state: state.into(),
        }
    }

    #[test]
    fn identical_content_is_surfaced_once() {
        let (detector, recorder) = detector();

        assert!(detector.notify_if_new(gateway("24.0.0-9", "Active")));
        assert!(!detector.notify_if_new(gateway("24.0.0-9", "Active")));

        assert_eq!(
            recorder.calls(),
            vec![(ResourceKind::Gateway, Some(DetectionReason::FirstSeen))]
        );
        assert_eq!(detector.reported_count(), 1);
    }

    #[test]
    fn new_but_unremarkable_content_reaches_sink_without_reason() {
        let (detector, recorder) = detector();

        detector.notify_if_new(gateway("24.0.0-9", "Active"));
        assert!(!detector.notify_if_new(gateway("24.0.0-9", "Degraded")));
        // Not remembered, so it is assessed again next time.
        assert!(!detector.notify_if_new(gateway("24.0.0-9", "Degraded")));

        let calls = recorder.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1], (ResourceKind::Gateway, None));
        assert_eq!(detector.reported_count(), 1);
    }

    #[test]
    fn firmware_change_is_newsworthy() {
        let (detector, recorder) = detector();

        detector.notify_if_new(gateway("24.0.0-9", "Active"));
        assert!(detector.notify_if_new(gateway("25.0.0-1", "Active")));

        assert_eq!(
            recorder.calls()[1].1,
            Some(DetectionReason::DetailsChanged {
                fields: vec!["firmware"]
            })
        );
    }

    #[test]
    fn same_payload_of_different_kinds_does_not_collide() {
        let (detector, _) = detector();

        assert!(detector.notify_if_new(Observation::SensorsInfo(Vec::new())));
        assert!(detector.notify_if_new(Observation::SensorsStatus(Vec::new())));
    }

    #[test]
    fn panel_status_changes() {
        let (detector, recorder) = detector();
        let quiet = |state| {
            Observation::PanelStatus(PanelStatus {
                state,
                status: Some("All Quiet".into()),
            })
        };

        detector.notify_if_new(quiet(ArmState::Off));
        assert!(detector.notify_if_new(quiet(ArmState::Away)));
        // Back to a previously surfaced payload: already reported.
        assert!(!detector.notify_if_new(quiet(ArmState::Off)));

        assert_eq!(
            recorder.calls()[1].1,
            Some(DetectionReason::ArmStateChanged {
                from: ArmState::Off,
                to: ArmState::Away
            })
        );
    }

    #[test]
    fn sensors_added_and_removed_by_device_id() {
        let (detector, recorder) = detector();
        let sensor = |id: &str| SensorInfo {
            device_id: id.into(),
            name: format!("Sensor {id}"),
            zone: 1,
            device_type: "sensor,motion".into(),
            status: None,
        };

        detector.notify_if_new(Observation::SensorsInfo(vec![sensor("1"), sensor("2")]));
        assert!(detector.notify_if_new(Observation::SensorsInfo(vec![sensor("2"), sensor("3")])));

        assert_eq!(
            recorder.calls()[1].1,
            Some(DetectionReason::SensorsChanged {
                added: vec!["3".into()],
                removed: vec!["1".into()],
            })
        );
    }

    #[test]
    fn sensor_state_change_by_name_and_zone() {
        let (detector, recorder) = detector();

        detector.notify_if_new(Observation::SensorsStatus(vec![
            status("Front Door", 1, "Closed"),
            status("Hallway", 5, "No Motion"),
        ]));
        assert!(detector.notify_if_new(Observation::SensorsStatus(vec![
            status("Front Door", 1, "Open"),
            status("Hallway", 5, "No Motion"),
        ])));

        assert_eq!(
            recorder.calls()[1].1,
            Some(DetectionReason::SensorStatesChanged {
                sensors: vec![("Front Door".into(), 1)]
            })
        );
    }

    #[test]
    fn session_version_change() {
        let (detector, _) = detector();
        let session = |v: &str| {
            Observation::Session(SessionInfo {
                portal_version: v.into(),
            })
        };

        assert!(detector.notify_if_new(session("27.0.0-140")));
        assert!(!detector.notify_if_new(session("27.0.0-140")));
        assert!(detector.notify_if_new(session("28.0.0-12")));
    }
}
