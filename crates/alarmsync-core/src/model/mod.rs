// ── Canonical device model ──
//
// The records the engine hands to the host registry. Recomputed in full
// on every reconciliation pass and diffed by `DeviceId`.

pub mod device;
pub mod device_id;
pub mod sensor_type;

pub use device::{Device, DeviceCategory};
pub use device_id::DeviceId;
pub use sensor_type::SensorType;
