//! bl-core: shared foundation for the undulator service.
//!
//! Contains:
//! - units (uom SI types, constructors and physical constants)
//! - numeric (finite-value guard for model writes)
//! - ids (element and device name newtypes)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
