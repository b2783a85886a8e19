//! bl-model: request/reply client for the backend lattice model.
//!
//! Every read or write of model state goes through a [`ModelTransport`]. The
//! production transport is [`TcpModelClient`]. With the `mock` feature,
//! `mock::RecordingTransport` records commands in memory for tests.
//!
//! Requests are `{"cmd": "tao", "val": <command>}` and replies carry a
//! `result` list of text lines. Both travel as one JSON object per line.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod protocol;
pub mod transport;

pub use client::{DEFAULT_HOST, DEFAULT_PORT, TcpModelClient};
pub use error::{ModelError, ModelResult};
pub use protocol::{Command, Reply};
pub use transport::ModelTransport;
