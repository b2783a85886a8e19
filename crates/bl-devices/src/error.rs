//! Error types for device operations.

use thiserror::Error;

/// Result type for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    /// Trigger received while a previous trigger is still in flight.
    #[error("Device {device} is already processing")]
    Busy { device: String },

    /// Field does not exist on this device family.
    #[error("Device {device} has no field {field}")]
    NoSuchField { device: String, field: &'static str },

    /// Write to a read-only field.
    #[error("Field {field} of {device} is read-only")]
    ReadOnly { device: String, field: &'static str },

    /// Written value is not usable.
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
}
