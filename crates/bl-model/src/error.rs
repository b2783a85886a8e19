use std::io;
use std::time::Duration;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to connect to model at {addr}: {source}")]
    Connect { addr: String, source: io::Error },

    #[error("Model I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode command: {0}")]
    Encode(serde_json::Error),

    #[error("Malformed reply {line:?}: {source}")]
    Decode {
        line: String,
        source: serde_json::Error,
    },

    #[error("Model closed the connection")]
    Closed,

    #[error("No reply to `{command}` within {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("Model connection unusable after an interrupted request, `{command}` not sent")]
    Poisoned { command: String },

    #[error("Model rejected `{command}`: {message}")]
    Rejected { command: String, message: String },
}
