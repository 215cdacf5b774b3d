//! Element models: series impedance and two-port ABCD per component kind.
//!
//! Lumped elements (R, L, C) expose the series impedance seen between
//! their terminals. Transmission lines expose the ABCD transmission
//! matrix, lossy or lossless. Integrated blocks are one-ports whose
//! impedance comes from recursively simulating their contents. Ground and
//! port symbols carry no model; the admittance builder never queries them.

use crate::overlay::ParamOverlay;
use crate::subcircuit;
use num_complex::Complex64;
use rfcalc_core::{Component, ComponentKind, RfResult, Schematic, TlineParams};
use std::f64::consts::{LN_10, TAU};

/// ABCD transmission matrix of a two-port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Abcd {
    pub a: Complex64,
    pub b: Complex64,
    pub c: Complex64,
    pub d: Complex64,
}

impl Abcd {
    /// Convert to short-circuit Y-parameters. `None` when `B = 0` (an
    /// ideal through, which has no Y representation).
    pub fn to_y(&self) -> Option<[Complex64; 4]> {
        if self.b.norm() == 0.0 {
            return None;
        }
        let inv_b = Complex64::new(1.0, 0.0) / self.b;
        // [Y11, Y12, Y21, Y22]
        Some([self.d * inv_b, -inv_b, -inv_b, self.a * inv_b])
    }

    /// Input impedance with the far side terminated in `z_load`:
    /// Zin = (A·Z_L + B) / (C·Z_L + D).
    pub fn input_impedance(&self, z_load: Complex64) -> Complex64 {
        (self.a * z_load + self.b) / (self.c * z_load + self.d)
    }
}

/// Series impedance of a kind at frequency `f` in Hz.
///
/// Returns `None` for kinds without a standalone impedance model (ground,
/// port, integrated — the latter needs schematic context, see
/// [`element_impedance`]). The capacitor at DC yields the non-finite
/// sentinel, which stamps as zero admittance.
pub fn kind_impedance(kind: &ComponentKind, f: f64) -> Option<Complex64> {
    let omega = TAU * f;
    match kind {
        ComponentKind::Resistor { resistance } => Some(Complex64::new(*resistance, 0.0)),
        ComponentKind::Inductor { inductance } => Some(Complex64::new(0.0, omega * inductance)),
        ComponentKind::Capacitor { capacitance } => {
            Some(Complex64::new(0.0, -1.0 / (omega * capacitance)))
        }
        // A line interrogated as a plain impedance reads its
        // characteristic impedance.
        ComponentKind::TransmissionLine(tl) => Some(Complex64::new(tl.z0, tl.z0_imag)),
        ComponentKind::Ground | ComponentKind::Port(_) | ComponentKind::Integrated(_) => None,
    }
}

/// Impedance of a placed component, resolving integrated blocks against
/// the schematic they live in.
pub fn element_impedance(
    schematic: &Schematic,
    component: &Component,
    overlay: &ParamOverlay,
    f: f64,
) -> RfResult<Option<Complex64>> {
    match &component.kind {
        ComponentKind::Integrated(block) => {
            let z = subcircuit::integrated_impedance(schematic, block, overlay, f)?;
            Ok(Some(z))
        }
        _ => Ok(kind_impedance(&overlay.kind_of(component), f)),
    }
}

/// ABCD matrix of a transmission line at frequency `f` in Hz.
///
/// Electrical length θ = 2π·f·length / velocity. Attenuation
/// α = loss·ln(10)/20 · length nepers. The lossless, real-Z0 case stays in
/// trigonometric form; otherwise the full hyperbolic form with complex
/// γl = α + jθ is used.
pub fn tline_abcd(tl: &TlineParams, f: f64) -> Abcd {
    let theta = TAU * f * tl.length / tl.velocity;

    if tl.loss_db == 0.0 && tl.z0_imag == 0.0 {
        let z0 = Complex64::new(tl.z0, 0.0);
        let (sin, cos) = theta.sin_cos();
        return Abcd {
            a: Complex64::new(cos, 0.0),
            b: Complex64::new(0.0, sin) * z0,
            c: Complex64::new(0.0, sin) / z0,
            d: Complex64::new(cos, 0.0),
        };
    }

    let zc = Complex64::new(tl.z0, tl.z0_imag);
    let alpha = tl.loss_db * LN_10 / 20.0 * tl.length;
    let gamma_l = Complex64::new(alpha, theta);
    let cosh = gamma_l.cosh();
    let sinh = gamma_l.sinh();
    Abcd {
        a: cosh,
        b: zc * sinh,
        c: sinh / zc,
        d: cosh,
    }
}

/// ABCD matrix of a kind, when it has one.
pub fn kind_abcd(kind: &ComponentKind, f: f64) -> Option<Abcd> {
    match kind {
        ComponentKind::TransmissionLine(tl) => Some(tline_abcd(tl, f)),
        _ => None,
    }
}
