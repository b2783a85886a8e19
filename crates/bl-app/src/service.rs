//! Service bootstrap.

use std::sync::Arc;

use bl_devices::Device;
use bl_model::{ModelTransport, TcpModelClient};
use bl_physics::{FileTableSource, GapFallbackPolicy, GapLookup, GapTableSource, SentinelZeroPolicy, StrictPolicy};
use tracing::{info, warn};

use crate::config::{GapFallback, ServiceConfig};
use crate::coordinator::ModelCoordinator;
use crate::error::AppResult;
use crate::names::NameMap;
use crate::pv_table::PvTable;
use crate::registry::DeviceRegistry;

/// Running device set and its PV surface.
#[derive(Debug)]
pub struct Service {
    devices: Vec<Arc<Device>>,
    pvs: PvTable,
    gaps: Arc<GapLookup>,
}

fn fallback_policy(mode: GapFallback) -> Arc<dyn GapFallbackPolicy> {
    match mode {
        GapFallback::SentinelZero => Arc::new(SentinelZeroPolicy::new()),
        GapFallback::Strict => Arc::new(StrictPolicy),
    }
}

impl Service {
    /// Build the service on explicit collaborators.
    pub async fn start(
        config: &ServiceConfig,
        model: Arc<dyn ModelTransport>,
        gap_source: Arc<dyn GapTableSource>,
        names: NameMap,
    ) -> AppResult<Self> {
        let gaps = Arc::new(GapLookup::with_policy(
            gap_source,
            fallback_policy(config.gap_tables.fallback),
        ));
        let coordinator = Arc::new(ModelCoordinator::new(model.clone(), gaps.clone()));

        let registry = DeviceRegistry::new(model, names);
        let devices = registry.load(coordinator, &config.devices).await?;
        let pvs = PvTable::new(&devices);

        info!(devices = devices.len(), pvs = pvs.len(), "Initialization complete.");
        Ok(Self { devices, pvs, gaps })
    }

    /// Connect to the model over TCP and read names and gap tables from the
    /// paths in `config`.
    pub async fn connect(config: &ServiceConfig) -> AppResult<Self> {
        let names = match &config.names {
            Some(path) => NameMap::load(path)?,
            None => {
                warn!("No name map configured, only the laser heater will be served");
                NameMap::default()
            }
        };
        let client = TcpModelClient::connect(&config.model.host, config.model.port)
            .await?
            .with_request_timeout(config.model.request_timeout());
        let source = FileTableSource::new(&config.gap_tables.dir);

        Self::start(config, Arc::new(client), Arc::new(source), names).await
    }

    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    pub fn pvs(&self) -> &PvTable {
        &self.pvs
    }

    pub fn gaps(&self) -> &GapLookup {
        &self.gaps
    }
}
