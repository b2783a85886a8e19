//! Unit conversions between control-system and lattice-model quantities.
//!
//! Undulator-family devices are controlled in K and modelled by their peak
//! field B_max:
//!
//! `B_max = K * 2π * m_e / (c * λ_u)`
//!
//! where `m_e` is the electron rest energy in eV and `λ_u` is the family
//! period. Phase shifters are controlled by their phase integral, which is
//! quadratic in B_max.

use std::f64::consts::PI;

use bl_core::constants::{C_LIGHT_MPS, M_ELECTRON_EV};
use bl_core::{CoreError, CoreResult, ElementName, FluxDensity, Length, in_mm, in_tesla, m, tesla};

/// Undulator period of the `USEG` family (m).
pub const USEG_PERIOD_M: f64 = 0.026;

/// Laser-heater undulator period (m).
pub const HEATER_PERIOD_M: f64 = 0.054;

/// Phase-shifter magnetic length (m).
pub const PHASE_SHIFTER_LENGTH_M: f64 = 0.0495;

/// Phase-shifter period (m).
pub const PHASE_SHIFTER_PERIOD_M: f64 = 0.045;

/// Phase integrals are reported in T²·mm²·m; the model works in T²·m³.
pub const PHASE_INTEGRAL_SCALE: f64 = 1e9;

/// BPM y-offset coefficient: `y = -C / gap³` with gap in mm, y in m.
pub const BPM_OFFSET_COEFF: f64 = 0.002_850;

/// Prefix of the BPM element that follows each undulator segment.
pub const BPM_ELEMENT_PREFIX: &str = "RFB";

#[inline]
fn k_to_bmax(k: f64, period_m: f64) -> FluxDensity {
    tesla(k * 2.0 * PI * M_ELECTRON_EV / (C_LIGHT_MPS * period_m))
}

/// K of a `USEG` undulator to the model's B_MAX.
pub fn undulator_k_to_bmax(k: f64) -> FluxDensity {
    k_to_bmax(k, USEG_PERIOD_M)
}

/// Model B_MAX of a `USEG` undulator back to K.
pub fn undulator_bmax_to_k(b_max: FluxDensity) -> f64 {
    (C_LIGHT_MPS * USEG_PERIOD_M) * in_tesla(b_max) / (2.0 * PI * M_ELECTRON_EV)
}

/// K of the laser-heater undulator to B_MAX.
pub fn heater_k_to_bmax(k: f64) -> FluxDensity {
    k_to_bmax(k, HEATER_PERIOD_M)
}

/// Phase-shifter B_MAX to phase integral.
pub fn phase_integral_from_bmax(b_max: FluxDensity) -> f64 {
    let b_lambda = in_tesla(b_max) * PHASE_SHIFTER_PERIOD_M / (2.0 * PI);
    PHASE_SHIFTER_LENGTH_M / 2.0 * b_lambda * b_lambda * PHASE_INTEGRAL_SCALE
}

/// Phase integral to phase-shifter B_MAX.
///
/// Returns the non-negative root; negative phase integrals have no real
/// field and yield NaN.
pub fn bmax_from_phase_integral(phase_integral: f64) -> FluxDensity {
    let root = (2.0 * phase_integral / (PHASE_SHIFTER_LENGTH_M * PHASE_INTEGRAL_SCALE)).sqrt();
    tesla(2.0 * PI / PHASE_SHIFTER_PERIOD_M * root)
}

/// Vertical BPM offset induced by an undulator at `gap`.
///
/// A zero gap yields negative infinity; callers must not write that value.
pub fn bpm_offset_from_gap(gap: Length) -> Length {
    let g = in_mm(gap);
    m(-BPM_OFFSET_COEFF / (g * g * g))
}

/// BPM element downstream of an undulator element.
///
/// `UMAHXH13` → `RFBHX13`: prefix, the beamline character at position 3 and
/// the two-character unit suffix.
pub fn bpm_element_from_undulator_element(element: &ElementName) -> CoreResult<ElementName> {
    let name = element.as_str();
    let malformed = |what| CoreError::MalformedName {
        name: name.to_string(),
        what,
    };
    let beamline = name
        .get(3..4)
        .ok_or_else(|| malformed("no beamline character at position 3"))?;
    let unit = name
        .len()
        .checked_sub(2)
        .and_then(|start| name.get(start..))
        .ok_or_else(|| malformed("no two-character unit suffix"))?;
    Ok(ElementName::new(format!(
        "{BPM_ELEMENT_PREFIX}{beamline}X{unit}"
    )))
}
