//! JSON-lines TCP client for the backend model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{ModelError, ModelResult};
use crate::protocol::{Command, Reply};
use crate::transport::ModelTransport;

/// Backend host. The model always runs next to the service.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Backend port when `MODEL_PORT` is not set.
pub const DEFAULT_PORT: u16 = 12312;

/// Single-connection client with at most one request in flight.
///
/// Callers queue on an async mutex, which hands out the connection in FIFO
/// order. A caller holds it from writing the request until the reply line
/// has been read, so replies can never be paired with the wrong request.
///
/// An exchange cut off part-way (timeout or I/O error) leaves the stream
/// position unknown. The client is then poisoned and every later request
/// fails with [`ModelError::Poisoned`] without touching the socket.
pub struct TcpModelClient {
    stream: Mutex<BufReader<TcpStream>>,
    addr: String,
    request_timeout: Option<Duration>,
    poisoned: AtomicBool,
}

impl TcpModelClient {
    /// Connect to the backend at `host:port`.
    pub async fn connect(host: &str, port: u16) -> ModelResult<Self> {
        let addr = format!("{host}:{port}");
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ModelError::Connect {
                addr: addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;

        info!(%addr, "Connected to model");

        Ok(Self {
            stream: Mutex::new(BufReader::new(stream)),
            addr,
            request_timeout: None,
            poisoned: AtomicBool::new(false),
        })
    }

    /// Bound each round trip. `None` waits forever.
    ///
    /// A timed-out request poisons the client.
    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Whether an interrupted exchange has made the connection unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::Acquire)
    }

    async fn round_trip(stream: &mut BufReader<TcpStream>, command: &Command) -> ModelResult<Reply> {
        let mut line = serde_json::to_string(command).map_err(ModelError::Encode)?;
        line.push('\n');

        stream.get_mut().write_all(line.as_bytes()).await?;
        stream.get_mut().flush().await?;

        let mut response = String::new();
        if stream.read_line(&mut response).await? == 0 {
            return Err(ModelError::Closed);
        }

        let reply: Reply =
            serde_json::from_str(response.trim_end()).map_err(|source| ModelError::Decode {
                line: response.trim_end().to_string(),
                source,
            })?;

        if let Some(message) = reply.error() {
            return Err(ModelError::Rejected {
                command: command.val.clone(),
                message: message.to_string(),
            });
        }
        Ok(reply)
    }
}

#[async_trait]
impl ModelTransport for TcpModelClient {
    async fn send(&self, command: Command) -> ModelResult<Reply> {
        let mut stream = self.stream.lock().await;
        if self.is_poisoned() {
            return Err(ModelError::Poisoned {
                command: command.val,
            });
        }
        debug!(%command, "Model request");

        let result = match self.request_timeout {
            Some(after) => timeout(after, Self::round_trip(&mut stream, &command))
                .await
                .unwrap_or_else(|_| {
                    Err(ModelError::Timeout {
                        command: command.val.clone(),
                        after,
                    })
                }),
            None => Self::round_trip(&mut stream, &command).await,
        };

        if let Err(e) = &result {
            if matches!(e, ModelError::Timeout { .. } | ModelError::Io(_)) {
                warn!(addr = %self.addr, "Model connection poisoned: {e}");
                self.poisoned.store(true, Ordering::Release);
            }
        }

        let reply = result?;
        debug!(lines = reply.result.len(), "Model reply");
        Ok(reply)
    }
}

impl std::fmt::Debug for TcpModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpModelClient")
            .field("addr", &self.addr)
            .field("request_timeout", &self.request_timeout)
            .field("poisoned", &self.is_poisoned())
            .finish()
    }
}
