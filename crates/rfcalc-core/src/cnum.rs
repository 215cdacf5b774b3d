//! Phasor helpers on top of [`num_complex::Complex64`].
//!
//! The engines express everything as complex ratios; the conversions here
//! (dB magnitude, phase readouts, Γ ↔ Z) are the only places where those
//! ratios turn into display quantities. Division by a zero-magnitude value
//! follows IEEE arithmetic and produces non-finite components; the
//! predicates below are how the rest of the workspace recognizes that
//! sentinel.

use crate::units::Degrees;
use num_complex::Complex64;

/// Magnitude floor used when converting to decibels. |S| = 0 would be
/// -inf dB; exports and plots clamp at this value instead.
pub const DB_FLOOR: f64 = -100.0;

/// `20·log10(|x|)`, clamped at [`DB_FLOOR`].
pub fn db20(x: Complex64) -> f64 {
    let mag = x.norm();
    if mag <= 0.0 {
        return DB_FLOOR;
    }
    (20.0 * mag.log10()).max(DB_FLOOR)
}

/// Phase of `x` in degrees, in (-180, 180].
pub fn phase_deg(x: Complex64) -> Degrees {
    Degrees(x.arg().to_degrees())
}

/// True when either component is non-finite (the "infinite" sentinel
/// produced by dividing by a zero-magnitude value).
#[inline]
pub fn is_non_finite(x: Complex64) -> bool {
    !x.re.is_finite() || !x.im.is_finite()
}

/// Reflection coefficient of impedance `z` against reference `z0`:
/// Γ = (Z − Z0) / (Z + Z0).
pub fn z_to_gamma(z: Complex64, z0: Complex64) -> Complex64 {
    (z - z0) / (z + z0)
}

/// Impedance seen for reflection coefficient `gamma` against reference
/// `z0`: Z = Z0·(1 + Γ)/(1 − Γ). Γ = 1 (ideal open) yields the
/// non-finite sentinel.
pub fn gamma_to_z(gamma: Complex64, z0: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    z0 * (one + gamma) / (one - gamma)
}

/// Voltage standing wave ratio for a reflection coefficient.
/// |Γ| ≥ 1 yields infinity.
pub fn vswr(gamma: Complex64) -> f64 {
    let mag = gamma.norm();
    if mag >= 1.0 {
        return f64::INFINITY;
    }
    (1.0 + mag) / (1.0 - mag)
}

/// Project a non-finite Γ back onto the unit circle, keeping the direction
/// of the finite components when one exists. Used when a tuned evaluation
/// lands on an ideal open.
pub fn clip_gamma(gamma: Complex64) -> Complex64 {
    if !is_non_finite(gamma) {
        return gamma;
    }
    // Infinite components keep their sign, NaN contributes nothing.
    let dir = Complex64::new(clip_part(gamma.re), clip_part(gamma.im));
    let mag = dir.norm();
    if mag == 0.0 {
        Complex64::new(1.0, 0.0)
    } else {
        dir / mag
    }
}

fn clip_part(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else if v.is_nan() {
        0.0
    } else {
        v.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db20() {
        assert!((db20(Complex64::new(1.0, 0.0)) - 0.0).abs() < 1e-12);
        assert!((db20(Complex64::new(0.5, 0.0)) + 6.0206).abs() < 1e-3);
        assert_eq!(db20(Complex64::new(0.0, 0.0)), DB_FLOOR);
        // 1/3 reflection of a matched series resistor
        assert!((db20(Complex64::new(1.0 / 3.0, 0.0)) + 9.5424).abs() < 1e-3);
    }

    #[test]
    fn test_phase_deg() {
        assert!((phase_deg(Complex64::new(0.0, 1.0)).value() - 90.0).abs() < 1e-12);
        assert!((phase_deg(Complex64::new(-1.0, 0.0)).value() - 180.0).abs() < 1e-12);
    }

    #[test]
    fn test_gamma_z_round_trip() {
        let z0 = Complex64::new(50.0, 0.0);
        let z = Complex64::new(75.0, 25.0);
        let gamma = z_to_gamma(z, z0);
        let back = gamma_to_z(gamma, z0);
        assert!((back - z).norm() < 1e-9);
    }

    #[test]
    fn test_gamma_of_short_and_match() {
        let z0 = Complex64::new(50.0, 0.0);
        let short = z_to_gamma(Complex64::new(0.0, 0.0), z0);
        assert!((short - Complex64::new(-1.0, 0.0)).norm() < 1e-12);
        let matched = z_to_gamma(z0, z0);
        assert!(matched.norm() < 1e-12);
    }

    #[test]
    fn test_vswr() {
        assert!((vswr(Complex64::new(0.0, 0.0)) - 1.0).abs() < 1e-12);
        assert!((vswr(Complex64::new(1.0 / 3.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!(vswr(Complex64::new(1.0, 0.0)).is_infinite());
    }

    #[test]
    fn test_clip_gamma() {
        let finite = Complex64::new(0.3, -0.4);
        assert_eq!(clip_gamma(finite), finite);

        let open = gamma_to_z(Complex64::new(1.0, 0.0), Complex64::new(50.0, 0.0));
        assert!(is_non_finite(open));
        let clipped = clip_gamma(Complex64::new(f64::INFINITY, 0.0));
        assert!((clipped.norm() - 1.0).abs() < 1e-12);
        assert!((clipped - Complex64::new(1.0, 0.0)).norm() < 1e-12);
    }
}
