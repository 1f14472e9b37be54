// ── Device registry adapter ──
//
// The host owns the device records; the engine only tells it what to add,
// update or remove. The adapter remembers which ids it has handed over so
// every pass can be applied as an idempotent diff.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::model::{Device, DeviceId};

/// The host's device lifecycle.
pub trait DeviceRegistry: Send + Sync {
    /// Register a new device. An id that already exists is
    /// [`RegistryError::AlreadyExists`].
    fn add(&self, device: &Device) -> Result<(), RegistryError>;

    fn update(&self, device: &Device) -> Result<(), RegistryError>;

    fn remove(&self, device: &Device) -> Result<(), RegistryError>;
}

/// Outcome counts of one [`RegistryAdapter::diff_and_apply`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub added: usize,
    pub updated: usize,
    pub failed: usize,
}

// ── RegistryAdapter ──────────────────────────────────────────────

pub struct RegistryAdapter {
    registry: Arc<dyn DeviceRegistry>,
    known: Mutex<HashMap<DeviceId, Device>>,
}

impl RegistryAdapter {
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        Self::with_restored(registry, Vec::new())
    }

    /// Adapter seeded with the devices the host restored from its own cache.
    pub fn with_restored(registry: Arc<dyn DeviceRegistry>, restored: Vec<Device>) -> Self {
        let known = restored.into_iter().map(|d| (d.id.clone(), d)).collect();
        Self {
            registry,
            known: Mutex::new(known),
        }
    }

    fn known(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.known.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn known_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.known().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Update known devices and add new ones.
    ///
    /// Known devices missing from `devices` are left in place. Registry
    /// errors are logged per device and never abort the pass.
    pub fn diff_and_apply(&self, devices: &[Device]) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut known = self.known();

        for device in devices {
            if known.contains_key(&device.id) {
                match self.registry.update(device) {
                    Ok(()) => {
                        known.insert(device.id.clone(), device.clone());
                        report.updated += 1;
                    }
                    Err(e) => {
                        warn!(id = %device.id, error = %e, "device update failed");
                        report.failed += 1;
                    }
                }
                continue;
            }

            match self.registry.add(device) {
                Ok(()) => {
                    debug!(id = %device.id, name = %device.name, "device added");
                    known.insert(device.id.clone(), device.clone());
                    report.added += 1;
                }
                Err(RegistryError::AlreadyExists(id)) => {
                    // Host has it already; update from the next pass on.
                    warn!(%id, "device already registered by host");
                    known.insert(id, device.clone());
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(id = %device.id, error = %e, "device add failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            added = report.added,
            updated = report.updated,
            failed = report.failed,
            "registry diff applied"
        );
        report
    }

    /// Remove every known device and forget them all. Returns how many
    /// removals the registry accepted.
    pub fn reset(&self) -> usize {
        let mut known = self.known();
        let mut removed = 0;
        for (id, device) in known.drain() {
            match self.registry.remove(&device) {
                Ok(()) => removed += 1,
                Err(e) => warn!(%id, error = %e, "device removal failed"),
            }
        }
        info!(removed, "registry reset");
        removed
    }
}

// ── MemoryRegistry ───────────────────────────────────────────────

/// In-process registry that keeps records in a map and logs every change.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    devices: Mutex<HashMap<DeviceId, Device>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn devices(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current records, ordered by id.
    pub fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices().values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}

impl DeviceRegistry for MemoryRegistry {
    fn add(&self, device: &Device) -> Result<(), RegistryError> {
        let mut devices = self.devices();
        if devices.contains_key(&device.id) {
            return Err(RegistryError::AlreadyExists(device.id.clone()));
        }
        info!(id = %device.id, name = %device.name, category = %device.category, "registered device");
        devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    fn update(&self, device: &Device) -> Result<(), RegistryError> {
        let mut devices = self.devices();
        let Some(slot) = devices.get_mut(&device.id) else {
            return Err(RegistryError::NotFound(device.id.clone()));
        };
        if slot != device {
            debug!(id = %device.id, "device record changed");
            *slot = device.clone();
        }
        Ok(())
    }

    fn remove(&self, device: &Device) -> Result<(), RegistryError> {
        match self.devices().remove(&device.id) {
            Some(_) => {
                info!(id = %device.id, "removed device");
                Ok(())
            }
            None => Err(RegistryError::NotFound(device.id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceCategory;

    /// Counts calls per operation and can refuse one id.
    #[derive(Default)]
    struct Counting {
        inner: MemoryRegistry,
        calls: Mutex<(usize, usize, usize)>,
        refuse: Option<DeviceId>,
    }

    impl Counting {
        fn calls(&self) -> (usize, usize, usize) {
            *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn refused(&self, device: &Device) -> Result<(), RegistryError> {
            if self.refuse.as_ref() == Some(&device.id) {
                return Err(RegistryError::Rejected {
                    id: device.id.clone(),
                    message: "host said no".into(),
                });
            }
            Ok(())
        }
    }

    impl DeviceRegistry for Counting {
        fn add(&self, device: &Device) -> Result<(), RegistryError> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).0 += 1;
            self.refused(device)?;
            self.inner.add(device)
        }

        fn update(&self, device: &Device) -> Result<(), RegistryError> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).1 += 1;
            self.inner.update(device)
        }

        fn remove(&self, device: &Device) -> Result<(), RegistryError> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).2 += 1;
            self.inner.remove(device)
        }
    }

    fn device(id: DeviceId, name: &str) -> Device {
        Device {
            id,
            name: name.into(),
            category: DeviceCategory::Panel,
            manufacturer: None,
            model: None,
            zone: None,
        }
    }

    #[test]
    fn second_pass_only_updates() {
        let host = Arc::new(Counting::default());
        let adapter = RegistryAdapter::new(host.clone());
        let devices = vec![
            device(DeviceId::gateway(), "Gateway"),
            device(DeviceId::panel(), "Security Panel"),
        ];

        let first = adapter.diff_and_apply(&devices);
        assert_eq!(first, ApplyReport { added: 2, updated: 0, failed: 0 });

        let second = adapter.diff_and_apply(&devices);
        assert_eq!(second, ApplyReport { added: 0, updated: 2, failed: 0 });
        assert_eq!(host.calls(), (2, 2, 0));
    }

    #[test]
    fn absent_devices_are_left_alone() {
        let host = Arc::new(Counting::default());
        let adapter = RegistryAdapter::new(host.clone());
        adapter.diff_and_apply(&[device(DeviceId::gateway(), "Gateway"), device(DeviceId::panel(), "Panel")]);

        adapter.diff_and_apply(&[device(DeviceId::panel(), "Panel")]);

        assert_eq!(host.calls().2, 0);
        assert_eq!(host.inner.snapshot().len(), 2);
    }

    #[test]
    fn one_failure_does_not_abort_the_pass() {
        let host = Arc::new(Counting {
            refuse: Some(DeviceId::gateway()),
            ..Counting::default()
        });
        let adapter = RegistryAdapter::new(host.clone());

        let report = adapter.diff_and_apply(&[
            device(DeviceId::gateway(), "Gateway"),
            device(DeviceId::panel(), "Panel"),
        ]);

        assert_eq!(report, ApplyReport { added: 1, updated: 0, failed: 1 });
        assert_eq!(adapter.known_ids(), vec![DeviceId::panel()]);
    }

    #[test]
    fn restored_devices_are_updated_not_added() {
        let host = Arc::new(Counting::default());
        host.inner.add(&device(DeviceId::panel(), "Panel")).ok();
        let adapter =
            RegistryAdapter::with_restored(host.clone(), vec![device(DeviceId::panel(), "Panel")]);

        let report = adapter.diff_and_apply(&[device(DeviceId::panel(), "Security Panel")]);

        assert_eq!(report, ApplyReport { added: 0, updated: 1, failed: 0 });
        assert_eq!(host.inner.snapshot()[0].name, "Security Panel");
    }

    #[test]
    fn reset_removes_every_known_device() {
        let host = Arc::new(Counting::default());
        let restored = vec![
            device(DeviceId::gateway(), "Gateway"),
            device(DeviceId::panel(), "Panel"),
            device(DeviceId::sensor("17"), "Front Door"),
        ];
        for d in &restored {
            host.inner.add(d).ok();
        }
        let adapter = RegistryAdapter::with_restored(host.clone(), restored);

        assert_eq!(adapter.reset(), 3);
        assert_eq!(host.calls(), (0, 0, 3));
        assert!(adapter.known_ids().is_empty());
        assert!(host.inner.snapshot().is_empty());
    }

    #[test]
    fn memory_registry_rejects_duplicate_add() {
        let registry = MemoryRegistry::new();
        let panel = device(DeviceId::panel(), "Panel");
        registry.add(&panel).ok();

        assert_eq!(
            registry.add(&panel),
            Err(RegistryError::AlreadyExists(DeviceId::panel()))
        );
    }
}
