//! Process-variable name resolution over the device set.

use std::collections::BTreeMap;
use std::sync::Arc;

use bl_devices::{Access, Device, PvField};

use crate::error::{AppError, AppResult};

/// Result of a PV write.
#[derive(Debug, Clone)]
pub enum PutAction {
    /// Value stored.
    Written,
    /// The PV is a trigger; the caller runs `device.process()`.
    Trigger(Arc<Device>),
}

/// All published PVs, keyed by full name.
#[derive(Debug, Default)]
pub struct PvTable {
    entries: BTreeMap<String, (Arc<Device>, PvField)>,
}

impl PvTable {
    pub fn new<'a>(devices: impl IntoIterator<Item = &'a Arc<Device>>) -> Self {
        let mut entries = BTreeMap::new();
        for device in devices {
            for (suffix, field) in PvField::all(device.family()) {
                entries.insert(format!("{}{suffix}", device.name()), (device.clone(), *field));
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// PV names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn resolve(&self, pv: &str) -> AppResult<(&Arc<Device>, PvField)> {
        self.entries
            .get(pv)
            .map(|(device, field)| (device, *field))
            .ok_or_else(|| AppError::UnknownPv(pv.to_string()))
    }

    pub fn get(&self, pv: &str) -> AppResult<f64> {
        let (device, field) = self.resolve(pv)?;
        Ok(device.read(field)?)
    }

    /// Write `value` to `pv`. Trigger PVs accept any value.
    pub fn put(&self, pv: &str, value: f64) -> AppResult<PutAction> {
        let (device, field) = self.resolve(pv)?;
        match field.access() {
            Access::Trigger => Ok(PutAction::Trigger(device.clone())),
            Access::Writable | Access::ReadOnly => {
                device.write(field, value)?;
                Ok(PutAction::Written)
            }
        }
    }
}
