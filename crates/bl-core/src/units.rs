// bl-core/src/units.rs

use uom::si::f64::{Length as UomLength, MagneticFluxDensity as UomMagneticFluxDensity};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type FluxDensity = UomMagneticFluxDensity;

#[inline]
pub fn tesla(v: f64) -> FluxDensity {
    use uom::si::magnetic_flux_density::tesla;
    FluxDensity::new::<tesla>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

/// Value of a flux density in tesla.
#[inline]
pub fn in_tesla(b: FluxDensity) -> f64 {
    use uom::si::magnetic_flux_density::tesla;
    b.get::<tesla>()
}

/// Value of a length in millimetres (calibration tables store gaps in mm).
#[inline]
pub fn in_mm(l: Length) -> f64 {
    use uom::si::length::millimeter;
    l.get::<millimeter>()
}

/// Value of a length in metres (the model's offset unit).
#[inline]
pub fn in_m(l: Length) -> f64 {
    use uom::si::length::meter;
    l.get::<meter>()
}

pub mod constants {
    /// Electron rest energy (eV).
    pub const M_ELECTRON_EV: f64 = 0.510_998_946_1e6;

    /// Speed of light (m/s).
    pub const C_LIGHT_MPS: f64 = 2.997_924_58e8;
}
