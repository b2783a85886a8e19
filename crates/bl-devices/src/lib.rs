//! Simulated beamline devices for the undulator service.
//!
//! Every device holds a desired/actual value pair and a zero-argument
//! "process" trigger. Triggering a device waits out the actuator settling
//! delay, copies desired into actual and hands the new value to a shared
//! [`ChangeCoordinator`], which pushes it into the backend model.
//!
//! # Architecture
//!
//! - [`DeviceKind`] is a tagged union over the three device families and
//!   carries the family-specific read-only fields.
//! - [`Device`] owns the Idle/Processing state machine. Only a completed
//!   trigger writes the actual value.
//! - [`pv`] maps process-variable suffixes onto device fields.
//!
//! # Design Principles
//!
//! - **Injected coordinator**: devices never talk to the model directly
//! - **One trigger at a time**: a trigger while processing is rejected

pub mod coordinator;
pub mod device;
pub mod error;
pub mod family;
pub mod pv;

pub use coordinator::{ChangeCoordinator, DeviceChange};
pub use device::{DEFAULT_SETTLE, Device, DeviceSnapshot, Phase};
pub use error::{DeviceError, DeviceResult};
pub use family::{DeviceFamily, DeviceKind, UndulatorFields};
pub use pv::{Access, PvField};
