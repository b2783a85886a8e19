//! Element ↔ device name mapping.

use std::collections::HashMap;
use std::path::Path;

use bl_core::{DeviceName, ElementName};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// One row of the name map file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameEntry {
    pub element: ElementName,
    pub device: DeviceName,
}

/// Bidirectional element/device name lookup.
#[derive(Debug, Clone, Default)]
pub struct NameMap {
    by_element: HashMap<ElementName, DeviceName>,
    by_device: HashMap<DeviceName, ElementName>,
}

impl NameMap {
    /// Build from entries. Each element and each device may appear once.
    pub fn from_entries(entries: impl IntoIterator<Item = NameEntry>) -> AppResult<Self> {
        let mut map = Self::default();
        for NameEntry { element, device } in entries {
            if map.by_element.contains_key(&element) {
                return Err(AppError::Names(format!("element {element} listed twice")));
            }
            if map.by_device.contains_key(&device) {
                return Err(AppError::Names(format!("device {device} listed twice")));
            }
            map.by_element.insert(element.clone(), device.clone());
            map.by_device.insert(device, element);
        }
        Ok(map)
    }

    pub fn from_yaml_str(content: &str) -> AppResult<Self> {
        let entries: Vec<NameEntry> = serde_yaml::from_str(content)
            .map_err(|e| AppError::Names(format!("Failed to parse name map YAML: {e}")))?;
        Self::from_entries(entries)
    }

    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::FileRead {
            what: "name map",
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn device_for(&self, element: &ElementName) -> Option<&DeviceName> {
        self.by_element.get(element)
    }

    pub fn element_for(&self, device: &DeviceName) -> Option<&ElementName> {
        self.by_device.get(device)
    }

    pub fn len(&self) -> usize {
        self.by_element.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_element.is_empty()
    }
}
