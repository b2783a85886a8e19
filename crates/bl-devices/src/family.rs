//! Device families and their family-specific state.

use std::fmt;

use bl_core::DeviceName;

/// Control-system device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    /// Gap-adjustable undulator segment, controlled in K.
    Undulator,
    /// Inter-segment phase shifter, controlled by phase integral.
    PhaseShifter,
    /// The injector laser-heater undulator, controlled in K.
    LaserHeater,
}

impl DeviceFamily {
    /// Family of a discovered device, from its name prefix.
    ///
    /// `USEG` devices are undulators and `PHAS` devices phase shifters. The
    /// laser heater is never discovered and is built explicitly.
    pub fn from_device_name(name: &DeviceName) -> Option<Self> {
        match name.family_prefix() {
            "USEG" => Some(Self::Undulator),
            "PHAS" => Some(Self::PhaseShifter),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Undulator => "undulator",
            Self::PhaseShifter => "phase shifter",
            Self::LaserHeater => "laser heater",
        })
    }
}

/// Undulator fields reported by external systems.
///
/// Set at construction. Only `taper_desired` is writable and nothing in the
/// service acts on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UndulatorFields {
    pub taper_desired: f64,
    pub taper_actual: f64,
    pub symmetry_actual: f64,
    pub serial_number: f64,
    /// Gap encoder readback (mm)
    pub gap_readback: f64,
}

/// Family tag plus family-specific state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceKind {
    Undulator(UndulatorFields),
    PhaseShifter,
    LaserHeater,
}

impl DeviceKind {
    pub fn undulator() -> Self {
        Self::Undulator(UndulatorFields::default())
    }

    pub fn family(&self) -> DeviceFamily {
        match self {
            Self::Undulator(_) => DeviceFamily::Undulator,
            Self::PhaseShifter => DeviceFamily::PhaseShifter,
            Self::LaserHeater => DeviceFamily::LaserHeater,
        }
    }
}
