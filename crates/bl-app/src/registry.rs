//! Startup discovery and device construction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bl_core::{DeviceName, ElementName, tesla};
use bl_devices::{ChangeCoordinator, Device, DeviceFamily, DeviceKind};
use bl_model::{Command, ModelTransport};
use bl_physics::{phase_integral_from_bmax, undulator_bmax_to_k};
use tracing::{debug, info, warn};

use crate::config::DevicesConfig;
use crate::coordinator::B_MAX;
use crate::error::AppResult;
use crate::names::NameMap;
use crate::table::{AttributeRow, parse_attribute_table, parse_element_list};

/// Element-name pattern and substring selecting undulator segments.
const UNDULATOR_PATTERN: (&str, &str) = ("UMA*", "UMA");

/// Element-name pattern and substring selecting phase shifters.
const PHASE_SHIFTER_PATTERN: (&str, &str) = ("PS*", "PS");

/// Initial control-system value for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct InitialValue {
    pub element: ElementName,
    pub family: DeviceFamily,
    /// K for undulators, phase integral for phase shifters
    pub value: f64,
}

impl InitialValue {
    fn from_row(row: &AttributeRow) -> Option<Self> {
        let name = row.element.as_str();
        let b_max = tesla(row.value);
        let (family, value) = if name.contains(UNDULATOR_PATTERN.1) {
            (DeviceFamily::Undulator, undulator_bmax_to_k(b_max))
        } else if name.contains(PHASE_SHIFTER_PATTERN.1) {
            (DeviceFamily::PhaseShifter, phase_integral_from_bmax(b_max))
        } else {
            return None;
        };
        Some(Self {
            element: row.element.clone(),
            family,
            value,
        })
    }
}

/// Builds the device set from the model's current state.
pub struct DeviceRegistry {
    model: Arc<dyn ModelTransport>,
    names: NameMap,
}

impl DeviceRegistry {
    pub fn new(model: Arc<dyn ModelTransport>, names: NameMap) -> Self {
        Self { model, names }
    }

    pub fn names(&self) -> &NameMap {
        &self.names
    }

    /// All non-slave wiggler elements in the model.
    pub async fn discover_elements(&self) -> AppResult<Vec<ElementName>> {
        let reply = self.model.send(Command::show_wigglers()).await?;
        let elements = parse_element_list(&reply.result);
        debug!(count = elements.len(), "Discovered wiggler elements");
        Ok(elements)
    }

    /// Current model values of `elements`, converted to control units and
    /// keyed by device name.
    ///
    /// Elements without a device name, or without a row in the model's
    /// attribute tables, are left out.
    pub async fn fetch_initial_values(
        &self,
        elements: &[ElementName],
    ) -> AppResult<HashMap<DeviceName, InitialValue>> {
        let wanted: HashSet<&ElementName> = elements.iter().collect();
        let mut values = HashMap::new();

        for (pattern, _) in [UNDULATOR_PATTERN, PHASE_SHIFTER_PATTERN] {
            let reply = self
                .model
                .send(Command::show_attribute(B_MAX, pattern))
                .await?;

            for row in parse_attribute_table(&reply.result) {
                if !wanted.contains(&row.element) {
                    continue;
                }
                let Some(initial) = InitialValue::from_row(&row) else {
                    continue;
                };
                let Some(device) = self.names.device_for(&row.element) else {
                    debug!(element = %row.element, "No device name for element");
                    continue;
                };
                values.insert(device.clone(), initial);
            }
        }
        Ok(values)
    }

    /// Devices for discovered elements that have an initial value.
    ///
    /// The device family comes from the device-name prefix and must agree
    /// with the family of the initial value.
    pub fn build_devices(
        &self,
        elements: &[ElementName],
        initial: &HashMap<DeviceName, InitialValue>,
        coordinator: Arc<dyn ChangeCoordinator>,
        settings: &DevicesConfig,
    ) -> Vec<Arc<Device>> {
        let mut devices = Vec::new();
        for element in elements {
            let Some(device) = self.names.device_for(element) else {
                continue;
            };
            let Some(value) = initial.get(device) else {
                continue;
            };
            let kind = match DeviceFamily::from_device_name(device) {
                Some(DeviceFamily::Undulator) => DeviceKind::undulator(),
                Some(DeviceFamily::PhaseShifter) => DeviceKind::PhaseShifter,
                _ => continue,
            };
            if kind.family() != value.family {
                warn!(
                    %device,
                    %element,
                    "Device family does not match model element, skipping"
                );
                continue;
            }
            debug!(%device, %element, value = value.value, "Creating device");
            devices.push(Arc::new(
                Device::new(
                    device.clone(),
                    element.clone(),
                    kind,
                    value.value,
                    coordinator.clone(),
                )
                .with_settle(settings.settle()),
            ));
        }
        devices
    }

    /// The laser-heater undulator described by `settings`.
    pub fn laser_heater(
        settings: &DevicesConfig,
        coordinator: Arc<dyn ChangeCoordinator>,
    ) -> Arc<Device> {
        let heater = &settings.heater;
        Arc::new(
            Device::new(
                heater.device_name.clone(),
                heater.element_name.clone(),
                DeviceKind::LaserHeater,
                heater.initial_k,
                coordinator,
            )
            .with_settle(settings.settle()),
        )
    }

    /// Discover, fetch initial values and build every device, heater
    /// included.
    pub async fn load(
        &self,
        coordinator: Arc<dyn ChangeCoordinator>,
        settings: &DevicesConfig,
    ) -> AppResult<Vec<Arc<Device>>> {
        let elements = self.discover_elements().await?;
        let initial = self.fetch_initial_values(&elements).await?;
        let mut devices = self.build_devices(&elements, &initial, coordinator.clone(), settings);

        if devices.iter().any(|d| d.name() == &settings.heater.device_name) {
            warn!(device = %settings.heater.device_name, "Heater name also discovered, keeping discovered device");
        } else {
            devices.push(Self::laser_heater(settings, coordinator));
        }

        info!(count = devices.len(), "Devices created");
        Ok(devices)
    }
}
