//! S-parameter extraction from an assembled admittance system.
//!
//! The admittance matrix is inverted once; exciting port j with a unit
//! current and reading the voltage at port i is then a lookup into the
//! inverse, giving the open-circuit impedance matrix Z. Z is converted to
//! scattering parameters against the system reference:
//!
//! ```text
//! S = (Z − Z0·I) · (Z + Z0·I)⁻¹
//! ```
//!
//! Z-first rather than Y-first because the MNA admittance submatrix over
//! port nodes is not the network's Y-parameters once internal nodes
//! exist; solving per port is exact and costs O(P·K²) after the one-off
//! inversion.
//!
//! Failure handling is deliberately soft: a singular system yields the
//! fully reflective default matrix (`S_ii = −1`, zeros elsewhere) so a
//! sweep can note the point and continue.

use crate::admittance::{self, YSystem};
use crate::netlist::{self, Netlist};
use crate::overlay::ParamOverlay;
use num_complex::Complex64;
use rfcalc_core::{CMatrix, RfError, RfResult, Schematic};

/// Result of one port-parameter extraction.
#[derive(Debug, Clone)]
pub struct PortAnalysis {
    /// Scattering matrix, `ports × ports`
    pub s: CMatrix,
    /// Open-circuit impedance matrix, `ports × ports`
    pub z: CMatrix,
    /// Number of ports
    pub ports: usize,
    /// True when the solver failed and the default matrix was substituted
    pub degraded: bool,
}

impl PortAnalysis {
    /// S-parameter for (1-based speaking order, 0-based here) port pair.
    #[inline]
    pub fn s_param(&self, i: usize, j: usize) -> Complex64 {
        self.s.get(i, j)
    }

    /// Input impedance at port 1 (other ports open).
    pub fn input_impedance(&self) -> Complex64 {
        self.z.get(0, 0)
    }
}

/// The fully reflective fallback: `S_ii = −1`, `S_ij = 0`.
fn default_s(ports: usize) -> CMatrix {
    CMatrix::identity(ports).scale(Complex64::new(-1.0, 0.0))
}

/// Extract Z and S for every port of an assembled system.
pub fn port_analysis(ysys: &YSystem, netlist: &Netlist, z0: f64) -> PortAnalysis {
    let ports = netlist.ports.len();

    // An empty matrix means nothing but ports and ground: every port is
    // an open, S = I.
    if ysys.size == 0 {
        return PortAnalysis {
            s: CMatrix::identity(ports),
            z: CMatrix::new(ports, ports),
            ports,
            degraded: false,
        };
    }

    let inverse = match ysys.matrix.inverse() {
        Ok(inv) => inv,
        Err(_) => {
            return PortAnalysis {
                s: default_s(ports),
                z: CMatrix::new(ports, ports),
                ports,
                degraded: true,
            };
        }
    };

    // Z[i,j] = v_i with unit current injected at port j; a port folded
    // into ground keeps a zero row/column (an exact short).
    let mut z = CMatrix::new(ports, ports);
    for (jj, pj) in netlist.ports.iter().enumerate() {
        let Some(col) = ysys.index(pj.node) else {
            continue;
        };
        for (ii, pi) in netlist.ports.iter().enumerate() {
            let Some(row) = ysys.index(pi.node) else {
                continue;
            };
            z.set(ii, jj, inverse.get(row, col));
        }
    }

    match z_to_s(&z, z0) {
        Ok(s) => PortAnalysis {
            s,
            z,
            ports,
            degraded: false,
        },
        Err(_) => PortAnalysis {
            s: default_s(ports),
            z,
            ports,
            degraded: true,
        },
    }
}

/// `S = (Z − Z0·I)(Z + Z0·I)⁻¹`.
pub fn z_to_s(z: &CMatrix, z0: f64) -> RfResult<CMatrix> {
    let n = z.rows();
    let z0i = CMatrix::identity(n).scale(Complex64::new(z0, 0.0));
    let numer = z.sub(&z0i);
    let denom = z.add(&z0i);
    let s = numer.mul(&denom.inverse()?);
    for i in 0..n {
        for j in 0..n {
            if rfcalc_core::is_non_finite(s.get(i, j)) {
                return Err(rfcalc_core::NumericalError::NonFiniteResult.into());
            }
        }
    }
    Ok(s)
}

/// `Z = Z0·(I + S)(I − S)⁻¹`, the inverse conversion.
pub fn s_to_z(s: &CMatrix, z0: f64) -> RfResult<CMatrix> {
    let n = s.rows();
    let identity = CMatrix::identity(n);
    let z = identity
        .add(s)
        .mul(&identity.sub(s).inverse()?)
        .scale(Complex64::new(z0, 0.0));
    Ok(z)
}

/// One-shot scattering matrix of a schematic at a single frequency.
///
/// Builds the netlist and admittance system and extracts S against `z0`
/// (falling back to port 1's reference when `None`).
pub fn scattering_at(schematic: &Schematic, f: f64, z0: Option<f64>) -> RfResult<PortAnalysis> {
    if !(f.is_finite() && f >= 0.0) {
        return Err(RfError::InvalidInput(format!("bad frequency {f} Hz")));
    }
    let nl = netlist::build_netlist(schematic)?;
    let ysys = admittance::build_admittance(schematic, &nl, &ParamOverlay::new(), f)?;
    let z0 = z0.unwrap_or_else(|| schematic.system_z0());
    Ok(port_analysis(&ysys, &nl, z0))
}

/// Input impedance at port 1 of a schematic at a single frequency,
/// derived from the port-1 column solve.
pub fn input_impedance_at(schematic: &Schematic, f: f64) -> RfResult<Complex64> {
    let analysis = scattering_at(schematic, f, None)?;
    if analysis.degraded {
        return Err(rfcalc_core::NumericalError::SingularMatrix.into());
    }
    Ok(analysis.input_impedance())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_z_s_round_trip() {
        let mut z = CMatrix::new(2, 2);
        z.set(0, 0, c(75.0, 10.0));
        z.set(0, 1, c(5.0, -2.0));
        z.set(1, 0, c(5.0, -2.0));
        z.set(1, 1, c(30.0, 0.0));
        let s = z_to_s(&z, 50.0).unwrap();
        let back = s_to_z(&s, 50.0).unwrap();
        let err = back.sub(&z).frobenius_norm() / z.frobenius_norm();
        assert!(err < 1e-8);
    }

    #[test]
    fn test_matched_load_s11_zero() {
        let mut z = CMatrix::new(1, 1);
        z.set(0, 0, c(50.0, 0.0));
        let s = z_to_s(&z, 50.0).unwrap();
        assert!(s.get(0, 0).norm() < 1e-12);
    }

    #[test]
    fn test_short_s11_minus_one() {
        let z = CMatrix::new(1, 1);
        let s = z_to_s(&z, 50.0).unwrap();
        assert!((s.get(0, 0) - c(-1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_default_s_diag() {
        let s = default_s(3);
        assert_eq!(s.get(0, 0), c(-1.0, 0.0));
        assert_eq!(s.get(1, 2), c(0.0, 0.0));
    }
}
