//! bl-physics: conversions between control-system and model quantities.
//!
//! Provides:
//! - K / phase-integral to B_max conversions per device family
//! - BPM offset correction from undulator gap
//! - not-a-knot cubic spline used for gap(K) calibration curves
//! - per-beamline gap tables with an init-once lookup cache
//!
//! # Architecture
//!
//! Gap calibration data is supplied by a [`GapTableSource`]. The rest of the
//! service only sees [`GapLookup`], which owns one lazily-filled cell per
//! beamline and routes unknown elements through a [`GapFallbackPolicy`].

pub mod conversion;
pub mod error;
pub mod gap_table;
pub mod lookup;
pub mod policy;
pub mod spline;

pub use conversion::{
    bmax_from_phase_integral, bpm_element_from_undulator_element, bpm_offset_from_gap,
    heater_k_to_bmax, phase_integral_from_bmax, undulator_bmax_to_k, undulator_k_to_bmax,
};
pub use error::{PhysicsError, PhysicsResult};
pub use gap_table::{Beamline, CalibrationRecord, ElementCurve, FileTableSource, GapTable, GapTableSource};
pub use lookup::GapLookup;
pub use policy::{GapFallbackPolicy, GapOutcome, SentinelZeroPolicy, StrictPolicy};
pub use spline::CubicSpline;
