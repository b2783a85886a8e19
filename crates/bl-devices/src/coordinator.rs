use async_trait::async_trait;
use bl_core::{DeviceName, ElementName};

use crate::family::DeviceFamily;

/// New actual value produced by a completed trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceChange {
    pub device: DeviceName,
    pub element: ElementName,
    pub family: DeviceFamily,
    pub actual: f64,
}

/// Receives every completed device trigger.
///
/// One coordinator is shared by all devices. It owns all failure handling:
/// a trigger has completed once `on_change` returns, whatever the
/// coordinator managed to do with the change.
#[async_trait]
pub trait ChangeCoordinator: Send + Sync {
    async fn on_change(&self, change: DeviceChange);
}
