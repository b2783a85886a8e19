//! Process-variable field surface.
//!
//! Each device is published under its device name as prefix; a PV name is
//! the prefix followed by one of the family's field suffixes, e.g.
//! `USEG:UNDH:1350:KDes`.
//!
//! ```
//! use bl_devices::{DeviceFamily, PvField};
//!
//! assert_eq!(PvField::parse(DeviceFamily::Undulator, ":KDes"), Some(PvField::Desired));
//! assert_eq!(PvField::parse(DeviceFamily::PhaseShifter, ":KDes"), None);
//! ```

use crate::family::DeviceFamily;

/// Device field addressed by a PV suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PvField {
    /// Zero-argument trigger.
    Process,
    Desired,
    Actual,
    TaperDesired,
    TaperActual,
    SymmetryActual,
    SerialNumber,
    GapReadback,
}

/// How a field may be used from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Writable,
    /// Writing any value runs the device's process trigger.
    Trigger,
}

const UNDULATOR_FIELDS: &[(&str, PvField)] = &[
    (":ConvertK2Gap.PROC", PvField::Process),
    (":KDes", PvField::Desired),
    (":KAct", PvField::Actual),
    (":TaperDes", PvField::TaperDesired),
    (":TaperAct", PvField::TaperActual),
    (":SymmetryAct", PvField::SymmetryActual),
    (":SerialNum", PvField::SerialNumber),
    (":US:EncRbck", PvField::GapReadback),
];

const PHASE_SHIFTER_FIELDS: &[(&str, PvField)] = &[
    (":ConvertPI2Gap.PROC", PvField::Process),
    (":PIDes", PvField::Desired),
    (":PIAct", PvField::Actual),
];

const LASER_HEATER_FIELDS: &[(&str, PvField)] = &[
    (":TRIM.PROC", PvField::Process),
    (":KDES", PvField::Desired),
    (":KACT", PvField::Actual),
];

impl PvField {
    /// `(suffix, field)` pairs published for a family.
    pub fn all(family: DeviceFamily) -> &'static [(&'static str, PvField)] {
        match family {
            DeviceFamily::Undulator => UNDULATOR_FIELDS,
            DeviceFamily::PhaseShifter => PHASE_SHIFTER_FIELDS,
            DeviceFamily::LaserHeater => LASER_HEATER_FIELDS,
        }
    }

    /// Field for `suffix` (including the leading `:`) on a family.
    pub fn parse(family: DeviceFamily, suffix: &str) -> Option<Self> {
        Self::all(family)
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|(_, field)| *field)
    }

    pub fn access(self) -> Access {
        match self {
            Self::Process => Access::Trigger,
            Self::Desired | Self::TaperDesired => Access::Writable,
            Self::Actual
            | Self::TaperActual
            | Self::SymmetryActual
            | Self::SerialNumber
            | Self::GapReadback => Access::ReadOnly,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::Desired => "desired",
            Self::Actual => "actual",
            Self::TaperDesired => "taper desired",
            Self::TaperActual => "taper actual",
            Self::SymmetryActual => "symmetry actual",
            Self::SerialNumber => "serial number",
            Self::GapReadback => "gap readback",
        }
    }
}
