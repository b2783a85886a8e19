//! Line-oriented TCP access to the PV table.
//!
//! Requests, one per line:
//!
//! ```text
//! GET <pv>           -> OK <value>
//! PUT <pv> <value>   -> OK
//! LIST               -> one PV name per line, then END
//! ```
//!
//! Failures answer `ERR <message>`. A `PUT` to a process PV starts the
//! device trigger in its own task and answers immediately.

use std::net::SocketAddr;
use std::sync::Arc;

use bl_app::{PutAction, Service};
use bl_devices::Device;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Reply to one request line, plus a trigger to start if the request
/// asked for one.
#[derive(Debug)]
pub struct Response {
    pub lines: Vec<String>,
    pub trigger: Option<Arc<Device>>,
}

impl Response {
    fn ok(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            trigger: None,
        }
    }

    fn err(message: impl std::fmt::Display) -> Self {
        Self::ok(format!("ERR {message}"))
    }
}

/// Answer one request line.
pub fn handle_line(service: &Service, line: &str) -> Response {
    let mut words = line.split_whitespace();
    let pvs = service.pvs();
    match (words.next(), words.next(), words.next(), words.next()) {
        (Some("GET"), Some(pv), None, None) => match pvs.get(pv) {
            Ok(value) => Response::ok(format!("OK {value}")),
            Err(e) => Response::err(e),
        },
        (Some("PUT"), Some(pv), Some(raw), None) => {
            let Ok(value) = raw.parse::<f64>() else {
                return Response::err(format!("not a number: {raw}"));
            };
            match pvs.put(pv, value) {
                Ok(PutAction::Written) => Response::ok("OK"),
                Ok(PutAction::Trigger(device)) => Response {
                    lines: vec!["OK".to_string()],
                    trigger: Some(device),
                },
                Err(e) => Response::err(e),
            }
        }
        (Some("LIST"), None, None, None) => {
            let mut lines: Vec<String> = pvs.names().map(str::to_string).collect();
            lines.push("END".to_string());
            Response {
                lines,
                trigger: None,
            }
        }
        (None, ..) => Response {
            lines: Vec::new(),
            trigger: None,
        },
        _ => Response::err(format!("bad request: {}", line.trim())),
    }
}

fn spawn_trigger(device: Arc<Device>) {
    tokio::spawn(async move {
        if let Err(e) = device.process().await {
            warn!(device = %device.name(), "Trigger failed: {e}");
        }
    });
}

async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    service: Arc<Service>,
) -> std::io::Result<()> {
    debug!(%addr, "Gateway client connected");
    let (read, mut write) = socket.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        let response = handle_line(&service, &line);
        if let Some(device) = response.trigger {
            spawn_trigger(device);
        }
        for out in response.lines {
            write.write_all(out.as_bytes()).await?;
            write.write_all(b"\n").await?;
        }
        write.flush().await?;
    }

    debug!(%addr, "Gateway client disconnected");
    Ok(())
}

/// Accept clients until the listener fails.
pub async fn serve(listener: TcpListener, service: Arc<Service>) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "PV gateway listening");
    }
    loop {
        match listener.accept().await {
            Ok((socket, addr)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(socket, addr, service).await {
                        warn!(%addr, "Gateway client error: {e}");
                    }
                });
            }
            Err(e) => error!("Accept error: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bl_app::{NameMap, ServiceConfig};
    use bl_model::mock::RecordingTransport;
    use bl_physics::{Beamline, CalibrationRecord, GapTableSource, PhysicsResult};

    struct NoTables;

    impl GapTableSource for NoTables {
        fn load(&self, _beamline: Beamline) -> PhysicsResult<Vec<CalibrationRecord>> {
            Ok(Vec::new())
        }
    }

    async fn heater_only() -> (Arc<Service>, Arc<RecordingTransport>) {
        let model = Arc::new(RecordingTransport::new());
        let service = Service::start(
            &ServiceConfig::default(),
            model.clone(),
            Arc::new(NoTables),
            NameMap::default(),
        )
        .await
        .unwrap();
        (Arc::new(service), model)
    }

    #[tokio::test]
    async fn get_put_and_list() {
        let (service, _) = heater_only().await;

        let response = handle_line(&service, "GET USEG:IN20:466:KACT");
        assert_eq!(response.lines, vec!["OK 1.3852"]);

        let response = handle_line(&service, "PUT USEG:IN20:466:KDES 1.5");
        assert_eq!(response.lines, vec!["OK"]);
        assert!(response.trigger.is_none());
        assert_eq!(
            handle_line(&service, "GET USEG:IN20:466:KDES").lines,
            vec!["OK 1.5"]
        );

        let response = handle_line(&service, "LIST");
        assert_eq!(
            response.lines,
            vec![
                "USEG:IN20:466:KACT",
                "USEG:IN20:466:KDES",
                "USEG:IN20:466:TRIM.PROC",
                "END"
            ]
        );
    }

    #[tokio::test]
    async fn errors_are_reported_inline() {
        let (service, _) = heater_only().await;
        for line in [
            "GET NOPE",
            "PUT USEG:IN20:466:KACT 1.0",
            "PUT USEG:IN20:466:KDES abc",
            "FROB",
            "GET a b",
        ] {
            let response = handle_line(&service, line);
            assert_eq!(response.lines.len(), 1, "{line}");
            assert!(response.lines[0].starts_with("ERR "), "{line}");
        }
        assert!(handle_line(&service, "   ").lines.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn process_put_returns_trigger() {
        let (service, model) = heater_only().await;
        handle_line(&service, "PUT USEG:IN20:466:KDES 1.4");

        let response = handle_line(&service, "PUT USEG:IN20:466:TRIM.PROC 1");
        assert_eq!(response.lines, vec!["OK"]);
        let device = response.trigger.expect("trigger");
        device.process().await.unwrap();

        let sent = model.sent_vals();
        assert_eq!(sent.len(), 4);
        assert!(sent[3].starts_with("set ele LH_UND B_MAX = "));
        assert_eq!(
            handle_line(&service, "GET USEG:IN20:466:KACT").lines,
            vec!["OK 1.4"]
        );
    }
}
