//! Service layer for the simulated undulator service.
//!
//! Wires the device set to the backend model: configuration, startup
//! discovery, the change coordinator and the PV name table. The `undsim`
//! binary is a thin shell over [`Service`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod names;
pub mod pv_table;
pub mod registry;
pub mod service;
pub mod table;

pub use config::{
    DevicesConfig, GapFallback, GapTablesConfig, GatewayConfig, HeaterConfig, MODEL_PORT_ENV,
    ModelConfig, ServiceConfig,
};
pub use coordinator::ModelCoordinator;
pub use error::{AppError, AppResult};
pub use names::{NameEntry, NameMap};
pub use pv_table::{PutAction, PvTable};
pub use registry::{DeviceRegistry, InitialValue};
pub use service::Service;
