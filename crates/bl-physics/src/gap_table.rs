//! Per-beamline gap(K) calibration tables.
//!
//! Calibration data arrives as one record per undulator segment holding the
//! parallel `k` and `gap` arrays from the magnetic measurement. Measurements
//! are taken from open to closed gap, so K usually decreases along the
//! arrays; tables are normalised to ascending K before use.

use std::fmt;
use std::path::{Path, PathBuf};

use bl_core::ElementName;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};
use crate::spline::CubicSpline;

/// Calibration bucket. Hard X-ray segments have `UMAH` in their element
/// name; everything else belongs to the soft X-ray line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Beamline {
    Hard,
    Soft,
}

impl Beamline {
    pub fn for_element(element: &ElementName) -> Self {
        if element.as_str().contains("UMAH") {
            Self::Hard
        } else {
            Self::Soft
        }
    }

    /// Lowercase tag used in dataset file names.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Hard => "hard",
            Self::Soft => "soft",
        }
    }
}

impl fmt::Display for Beamline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One segment's measurement as supplied by the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub element: ElementName,
    #[serde(default)]
    pub serial: String,
    pub k: Vec<f64>,
    /// Gap in mm, paired with `k`
    pub gap: Vec<f64>,
}

/// Normalised (ascending K) samples for one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCurve {
    pub element: ElementName,
    pub serial: String,
    k: Vec<f64>,
    gap_mm: Vec<f64>,
}

impl ElementCurve {
    fn from_record(record: CalibrationRecord) -> PhysicsResult<Self> {
        let CalibrationRecord {
            element,
            serial,
            mut k,
            mut gap,
        } = record;
        if k.len() != gap.len() {
            return Err(PhysicsError::InvalidArg {
                what: "calibration k and gap arrays differ in length",
            });
        }
        if k.len() >= 2 && k[0] > k[k.len() - 1] {
            k.reverse();
            gap.reverse();
        }
        Ok(Self {
            element,
            serial,
            k,
            gap_mm: gap,
        })
    }

    pub fn k(&self) -> &[f64] {
        &self.k
    }

    pub fn gap_mm(&self) -> &[f64] {
        &self.gap_mm
    }

    /// Fit the gap(K) interpolant for this element.
    pub fn spline(&self) -> PhysicsResult<CubicSpline> {
        CubicSpline::not_a_knot(&self.k, &self.gap_mm)
    }
}

/// Cached calibration table for one beamline.
#[derive(Debug, Clone)]
pub struct GapTable {
    beamline: Beamline,
    curves: Vec<ElementCurve>,
}

impl GapTable {
    pub fn from_records(beamline: Beamline, records: Vec<CalibrationRecord>) -> PhysicsResult<Self> {
        let curves = records
            .into_iter()
            .map(ElementCurve::from_record)
            .collect::<PhysicsResult<Vec<_>>>()?;
        Ok(Self { beamline, curves })
    }

    pub fn beamline(&self) -> Beamline {
        self.beamline
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Linear scan for the element's curve.
    pub fn curve(&self, element: &ElementName) -> Option<&ElementCurve> {
        self.curves.iter().find(|c| &c.element == element)
    }
}

/// Supplier of raw calibration records.
///
/// Called at most once per beamline by [`crate::GapLookup`].
pub trait GapTableSource: Send + Sync {
    fn load(&self, beamline: Beamline) -> PhysicsResult<Vec<CalibrationRecord>>;
}

/// Reads `gap_table_{hard|soft}.yaml` from a directory.
#[derive(Debug, Clone)]
pub struct FileTableSource {
    dir: PathBuf,
}

impl FileTableSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, beamline: Beamline) -> PathBuf {
        self.dir.join(format!("gap_table_{}.yaml", beamline.tag()))
    }

    fn read(path: &Path) -> PhysicsResult<Vec<CalibrationRecord>> {
        let content = std::fs::read_to_string(path).map_err(|source| PhysicsError::TableRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| PhysicsError::TableParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl GapTableSource for FileTableSource {
    fn load(&self, beamline: Beamline) -> PhysicsResult<Vec<CalibrationRecord>> {
        Self::read(&self.path_for(beamline))
    }
}
