use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::protocol::{Command, Reply};

/// Request/reply channel to the backend model.
///
/// Implementations complete each `send` before the next is issued, so all
/// commands reach the backend in the order their callers obtained the
/// transport.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn send(&self, command: Command) -> ModelResult<Reply>;
}

#[async_trait]
impl<T: ModelTransport + ?Sized> ModelTransport for Arc<T> {
    async fn send(&self, command: Command) -> ModelResult<Reply> {
        (**self).send(command).await
    }
}
