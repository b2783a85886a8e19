//! Service configuration.
//!
//! Loaded from YAML. Every field has a default, so an absent file or an
//! empty document gives a working local setup. `MODEL_PORT` in the
//! environment overrides the model port after the file is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bl_core::{DeviceName, ElementName};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Environment variable overriding [`ModelConfig::port`].
pub const MODEL_PORT_ENV: &str = "MODEL_PORT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model: ModelConfig,
    pub devices: DevicesConfig,
    pub gap_tables: GapTablesConfig,
    /// Element/device name map file
    pub names: Option<PathBuf>,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub host: String,
    pub port: u16,
    /// Unset means wait for the model indefinitely.
    pub request_timeout_ms: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            host: bl_model::DEFAULT_HOST.to_string(),
            port: bl_model::DEFAULT_PORT,
            request_timeout_ms: None,
        }
    }
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Actuator settling delay per trigger
    pub settle_ms: u64,
    pub heater: HeaterConfig,
}

impl Default for DevicesConfig {
    fn default() -> Self {
        Self {
            settle_ms: 200,
            heater: HeaterConfig::default(),
        }
    }
}

impl DevicesConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// The single laser-heater undulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaterConfig {
    pub device_name: DeviceName,
    pub element_name: ElementName,
    pub initial_k: f64,
}

impl Default for HeaterConfig {
    fn default() -> Self {
        Self {
            device_name: DeviceName::new("USEG:IN20:466"),
            element_name: ElementName::new("LH_UND"),
            initial_k: 1.3852,
        }
    }
}

/// What a gap lookup returns for an uncalibrated element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFallback {
    /// Zero gap, still written through to the BPM offset step.
    #[default]
    SentinelZero,
    /// No gap; the BPM offset write is skipped.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapTablesConfig {
    /// Directory holding `gap_table_hard.yaml` and `gap_table_soft.yaml`
    pub dir: PathBuf,
    pub fallback: GapFallback,
}

impl Default for GapTablesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("gap_tables"),
            fallback: GapFallback::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5064".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {e}")))
    }

    /// Load from `path`, or defaults when `path` is `None` or does not exist.
    /// Relative paths in the file are taken from the file's directory. Applies
    /// the `MODEL_PORT` override.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| AppError::FileRead {
                        what: "config",
                        path: path.to_path_buf(),
                        source,
                    })?;
                let mut config = Self::from_yaml_str(&content)?;
                if let Some(base) = path.parent() {
                    config.resolve_paths(base);
                }
                config
            }
            Some(path) => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.apply_port_override(std::env::var(MODEL_PORT_ENV).ok().as_deref())?;
        Ok(config)
    }

    /// Replace the model port with `value` when set.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> AppResult<()> {
        let Some(value) = value else {
            return Ok(());
        };
        self.model.port = value.trim().parse().map_err(|_| {
            AppError::Config(format!("{MODEL_PORT_ENV} is not a port number: {value:?}"))
        })?;
        Ok(())
    }

    /// Resolve relative paths against `base` (normally the config file's
    /// directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        if self.gap_tables.dir.is_relative() {
            self.gap_tables.dir = base.join(&self.gap_tables.dir);
        }
        if let Some(names) = self.names.as_mut() {
            if names.is_relative() {
                *names = base.join(&*names);
            }
        }
    }
}
