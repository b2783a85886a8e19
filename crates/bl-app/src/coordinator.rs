//! Pushes completed device triggers into the backend model.
//!
//! Per trigger:
//! - undulator: `B_MAX` write, then the downstream BPM's `y_offset` write
//! - phase shifter: one `B_MAX` write
//! - laser heater: one `B_MAX` write to the heater element
//!
//! One trigger's writes reach the model back to back; a trigger that
//! completes meanwhile waits for them. Failures are logged and end the
//! handling of that trigger. Nothing is reported back to the device.

use std::sync::Arc;

use async_trait::async_trait;
use bl_core::{ElementName, FluxDensity, ensure_finite, in_m, in_tesla};
use bl_devices::{ChangeCoordinator, DeviceChange, DeviceFamily};
use bl_model::{Command, ModelTransport};
use bl_physics::{
    GapLookup, bmax_from_phase_integral, bpm_element_from_undulator_element, bpm_offset_from_gap,
    heater_k_to_bmax, undulator_k_to_bmax,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::AppResult;

/// Model attribute holding an undulator-family element's peak field.
pub const B_MAX: &str = "B_MAX";

/// Model attribute holding a BPM's vertical offset.
pub const Y_OFFSET: &str = "y_offset";

/// The change callback shared by all devices.
pub struct ModelCoordinator {
    model: Arc<dyn ModelTransport>,
    gaps: Arc<GapLookup>,
    /// Held for the whole of one trigger's write sequence
    sequence: Mutex<()>,
}

impl ModelCoordinator {
    pub fn new(model: Arc<dyn ModelTransport>, gaps: Arc<GapLookup>) -> Self {
        Self {
            model,
            gaps,
            sequence: Mutex::new(()),
        }
    }

    async fn set(&self, element: &ElementName, attribute: &str, value: f64) -> AppResult<()> {
        let value = ensure_finite(value, "model attribute value")?;
        self.model
            .send(Command::set_attribute(element.as_str(), attribute, value))
            .await?;
        Ok(())
    }

    async fn set_b_max(&self, element: &ElementName, b_max: FluxDensity) -> AppResult<()> {
        self.set(element, B_MAX, in_tesla(b_max)).await
    }

    /// Correct the BPM downstream of an undulator for its new gap.
    ///
    /// Skipped when the fallback policy supplies no gap.
    async fn push_bpm_offset(&self, element: &ElementName, k: f64) -> AppResult<()> {
        let outcome = self.gaps.lookup_gap(element, k).await?;
        let Some(gap) = outcome.gap() else {
            debug!(%element, "No gap for element, BPM offset not updated");
            return Ok(());
        };
        let offset = bpm_offset_from_gap(gap);
        let bpm = bpm_element_from_undulator_element(element)?;
        self.set(&bpm, Y_OFFSET, in_m(offset)).await
    }

    async fn apply(&self, change: &DeviceChange) -> AppResult<()> {
        let element = &change.element;
        match change.family {
            DeviceFamily::Undulator => {
                self.set_b_max(element, undulator_k_to_bmax(change.actual))
                    .await?;
                self.push_bpm_offset(element, change.actual).await?;
            }
            DeviceFamily::PhaseShifter => {
                self.set_b_max(element, bmax_from_phase_integral(change.actual))
                    .await?;
            }
            DeviceFamily::LaserHeater => {
                self.set_b_max(element, heater_k_to_bmax(change.actual))
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeCoordinator for ModelCoordinator {
    async fn on_change(&self, change: DeviceChange) {
        let _sequence = self.sequence.lock().await;
        if let Err(e) = self.apply(&change).await {
            warn!(
                device = %change.device,
                element = %change.element,
                value = change.actual,
                "Model not updated: {e}"
            );
        }
    }
}

impl std::fmt::Debug for ModelCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCoordinator")
            .field("gaps", &self.gaps)
            .finish_non_exhaustive()
    }
}
