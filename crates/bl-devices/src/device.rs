//! Device state machine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bl_core::{DeviceName, ElementName};
use tracing::{debug, info, warn};

use crate::coordinator::{ChangeCoordinator, DeviceChange};
use crate::error::{DeviceError, DeviceResult};
use crate::family::{DeviceFamily, DeviceKind};
use crate::pv::{Access, PvField};

/// Actuator settling delay applied by each trigger.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Trigger state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Processing,
}

/// Point-in-time copy of a device's values.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSnapshot {
    pub name: DeviceName,
    pub element: ElementName,
    pub desired: f64,
    pub actual: f64,
    pub phase: Phase,
    pub kind: DeviceKind,
}

struct Values {
    desired: f64,
    actual: f64,
    kind: DeviceKind,
}

/// Clears the processing flag when the trigger ends, including when the
/// trigger future is dropped part-way.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One simulated device.
///
/// Desired and actual start equal. The desired value may be written at any
/// time; the actual value changes only when [`Device::process`] completes.
pub struct Device {
    name: DeviceName,
    element: ElementName,
    values: Mutex<Values>,
    processing: AtomicBool,
    settle: Duration,
    coordinator: Arc<dyn ChangeCoordinator>,
}

impl Device {
    /// Create an idle device whose desired and actual values are `initial`.
    pub fn new(
        name: DeviceName,
        element: ElementName,
        kind: DeviceKind,
        initial: f64,
        coordinator: Arc<dyn ChangeCoordinator>,
    ) -> Self {
        Self {
            name,
            element,
            values: Mutex::new(Values {
                desired: initial,
                actual: initial,
                kind,
            }),
            processing: AtomicBool::new(false),
            settle: DEFAULT_SETTLE,
            coordinator,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    fn values(&self) -> MutexGuard<'_, Values> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &DeviceName {
        &self.name
    }

    pub fn element(&self) -> &ElementName {
        &self.element
    }

    pub fn family(&self) -> DeviceFamily {
        self.values().kind.family()
    }

    pub fn desired(&self) -> f64 {
        self.values().desired
    }

    pub fn actual(&self) -> f64 {
        self.values().actual
    }

    pub fn phase(&self) -> Phase {
        if self.processing.load(Ordering::Acquire) {
            Phase::Processing
        } else {
            Phase::Idle
        }
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        let values = self.values();
        DeviceSnapshot {
            name: self.name.clone(),
            element: self.element.clone(),
            desired: values.desired,
            actual: values.actual,
            phase: self.phase(),
            kind: values.kind.clone(),
        }
    }

    /// Set the desired value. Allowed while processing.
    ///
    /// # Errors
    ///
    /// Returns error if `value` is not finite.
    pub fn set_desired(&self, value: f64) -> DeviceResult<()> {
        self.write(PvField::Desired, value)
    }

    /// Read a published field.
    ///
    /// Trigger fields read as zero.
    ///
    /// # Errors
    ///
    /// Returns error if the field is not published for this device's family.
    pub fn read(&self, field: PvField) -> DeviceResult<f64> {
        let values = self.values();
        let undulator = match &values.kind {
            DeviceKind::Undulator(fields) => Some(fields),
            _ => None,
        };
        let value = match (field, undulator) {
            (PvField::Process, _) => Some(0.0),
            (PvField::Desired, _) => Some(values.desired),
            (PvField::Actual, _) => Some(values.actual),
            (PvField::TaperDesired, Some(u)) => Some(u.taper_desired),
            (PvField::TaperActual, Some(u)) => Some(u.taper_actual),
            (PvField::SymmetryActual, Some(u)) => Some(u.symmetry_actual),
            (PvField::SerialNumber, Some(u)) => Some(u.serial_number),
            (PvField::GapReadback, Some(u)) => Some(u.gap_readback),
            (_, None) => None,
        };
        value.ok_or_else(|| self.no_such_field(field))
    }

    /// Write a writable field. Trigger fields go through [`Device::process`].
    ///
    /// # Errors
    ///
    /// Returns error if the field is not writable, not published for this
    /// family, or `value` is not finite.
    pub fn write(&self, field: PvField, value: f64) -> DeviceResult<()> {
        if field.access() != Access::Writable {
            return Err(DeviceError::ReadOnly {
                device: self.name.to_string(),
                field: field.name(),
            });
        }
        if !value.is_finite() {
            return Err(DeviceError::InvalidValue {
                field: field.name(),
                value,
            });
        }

        let mut guard = self.values();
        let values = &mut *guard;
        match (field, &mut values.kind) {
            (PvField::Desired, _) => values.desired = value,
            (PvField::TaperDesired, DeviceKind::Undulator(u)) => u.taper_desired = value,
            _ => return Err(self.no_such_field(field)),
        }
        Ok(())
    }

    fn no_such_field(&self, field: PvField) -> DeviceError {
        DeviceError::NoSuchField {
            device: self.name.to_string(),
            field: field.name(),
        }
    }

    /// Run the process trigger.
    ///
    /// Waits the settling delay, copies desired into actual, then hands the
    /// new actual value to the coordinator. Returns the new actual value.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Busy`] if a trigger is already in flight; the
    /// in-flight trigger is unaffected.
    pub async fn process(&self) -> DeviceResult<f64> {
        let Some(_guard) = ProcessingGuard::acquire(&self.processing) else {
            warn!(device = %self.name, "Trigger ignored, device still processing");
            return Err(DeviceError::Busy {
                device: self.name.to_string(),
            });
        };

        debug!("Updating {}... ", self.name);
        tokio::time::sleep(self.settle).await;

        let (actual, family) = {
            let mut values = self.values();
            values.actual = values.desired;
            (values.actual, values.kind.family())
        };

        self.coordinator
            .on_change(DeviceChange {
                device: self.name.clone(),
                element: self.element.clone(),
                family,
                actual,
            })
            .await;

        info!("Updated {}.", self.name);
        Ok(actual)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("element", &self.element)
            .field("phase", &self.phase())
            .finish()
    }
}
