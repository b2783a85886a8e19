//! In-memory transport that records commands and answers from a script.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ModelError, ModelResult};
use crate::protocol::{Command, Reply};
use crate::transport::ModelTransport;

type Responder = Box<dyn Fn(&Command) -> Option<Reply> + Send + Sync>;

/// Records every command in issue order.
///
/// Replies come from registered `(prefix, reply)` rules, first match wins;
/// unmatched commands get an empty reply. Commands whose text starts with a
/// registered failure prefix are recorded and then rejected.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Command>>,
    rules: Vec<(String, Reply)>,
    failures: Vec<String>,
    responder: Option<Responder>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `lines` to commands starting with `prefix`.
    pub fn reply_to<I, S>(mut self, prefix: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push((prefix.to_string(), Reply::lines(lines)));
        self
    }

    /// Reject commands starting with `prefix`.
    pub fn fail_on(mut self, prefix: &str) -> Self {
        self.failures.push(prefix.to_string());
        self
    }

    /// Answer with a closure, consulted before the prefix rules.
    pub fn respond_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Command) -> Option<Reply> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(f));
        self
    }

    /// Commands sent so far.
    pub fn sent(&self) -> Vec<Command> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    /// Command strings sent so far.
    pub fn sent_vals(&self) -> Vec<String> {
        self.sent().into_iter().map(|c| c.val).collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl ModelTransport for RecordingTransport {
    async fn send(&self, command: Command) -> ModelResult<Reply> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(command.clone());
        }

        if self.failures.iter().any(|p| command.val.starts_with(p.as_str())) {
            return Err(ModelError::Rejected {
                command: command.val,
                message: "scripted failure".to_string(),
            });
        }

        if let Some(reply) = self.responder.as_ref().and_then(|f| f(&command)) {
            return Ok(reply);
        }

        Ok(self
            .rules
            .iter()
            .find(|(prefix, _)| command.val.starts_with(prefix.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_default())
    }
}
