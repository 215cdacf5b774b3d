//! Nodal admittance matrix assembly.
//!
//! Builds the K×K complex system `Y(f)` over the non-ground nodes of a
//! netlist. Every element contributes a stamp:
//!
//! - two-terminal lumped elements stamp the series admittance quadruple
//!   `Y[i,i] += y`, `Y[j,j] += y`, `Y[i,j] -= y`, `Y[j,i] -= y`;
//! - transmission lines convert their ABCD matrix to Y-parameters
//!   (`Y11 = D/B`, `Y22 = A/B`, `Y12 = Y21 = -1/B`) and stamp those;
//! - a degenerate two-port with `B = 0` (an ideal through) stamps a large
//!   series conductance instead, which approximates the short without an
//!   unsolvable block;
//! - one-port elements stamp `1/Z` as a shunt on their start node.
//!
//! Rows and columns belonging to the ground node are dropped. After
//! assembly every diagonal entry gets GMIN, which keeps the system
//! well-posed for floating sub-nets (a capacitive island at DC, an open
//! port) without perturbing physical results beyond numerical noise.

use crate::elements;
use crate::netlist::{Netlist, NodeId};
use crate::overlay::ParamOverlay;
use num_complex::Complex64;
use rfcalc_core::{is_non_finite, CMatrix, ComponentKind, RfResult, Schematic};
use std::collections::HashMap;

/// Regularization added to every diagonal entry.
pub const GMIN: f64 = 1e-12;

/// Admittance standing in for an exact short (|Z| = 0) and for the
/// degenerate ideal-through two-port.
pub const BIG_ADMITTANCE: f64 = 1e10;

/// The assembled system: matrix, node → row mapping, and size.
#[derive(Debug, Clone)]
pub struct YSystem {
    pub matrix: CMatrix,
    /// Node id → matrix row/column. Ground is absent.
    pub index_of: HashMap<NodeId, usize>,
    pub size: usize,
}

impl YSystem {
    /// Matrix row of a node, `None` for ground and unknown nodes.
    #[inline]
    pub fn index(&self, node: NodeId) -> Option<usize> {
        self.index_of.get(&node).copied()
    }
}

/// `1/z` with the sentinel rules: an exact short stamps
/// [`BIG_ADMITTANCE`], an open (non-finite impedance) stamps nothing.
fn admittance_of(z: Complex64) -> Complex64 {
    if is_non_finite(z) {
        Complex64::new(0.0, 0.0)
    } else if z.norm() == 0.0 {
        Complex64::new(BIG_ADMITTANCE, 0.0)
    } else {
        z.inv()
    }
}

/// Assemble `Y(f)` for the schematic over the given netlist.
///
/// `overlay` supplies tuned parameter overrides; pass an empty overlay
/// for the plain circuit. Integrated blocks recurse through their own
/// netlist/solve chain.
pub fn build_admittance(
    schematic: &Schematic,
    netlist: &Netlist,
    overlay: &ParamOverlay,
    f: f64,
) -> RfResult<YSystem> {
    let nodes = netlist.non_ground_nodes();
    let size = nodes.len();
    let index_of: HashMap<NodeId, usize> =
        nodes.iter().copied().enumerate().map(|(i, n)| (n, i)).collect();
    let mut matrix = CMatrix::new(size, size);

    let (interior_components, _) = crate::netlist::interior_ids(schematic);

    for component in schematic.components.values() {
        if interior_components.contains(&component.id) {
            continue;
        }
        match &component.kind {
            ComponentKind::Port(_) | ComponentKind::Ground => {}

            ComponentKind::TransmissionLine(tl) => {
                let mut tl = *tl;
                if let Some(length) = overlay.get(&component.id) {
                    tl.length = length;
                }
                let abcd = elements::tline_abcd(&tl, f);
                let i = terminal_index(netlist, &index_of, component, rfcalc_core::Terminal::Start);
                let j = terminal_index(netlist, &index_of, component, rfcalc_core::Terminal::End);
                match abcd.to_y() {
                    Some([y11, y12, y21, y22]) => {
                        stamp_two_port(&mut matrix, i, j, y11, y12, y21, y22);
                    }
                    None => {
                        // Ideal through: a large series conductance
                        let y = Complex64::new(BIG_ADMITTANCE, 0.0);
                        stamp_series(&mut matrix, i, j, y);
                    }
                }
            }

            ComponentKind::Integrated(_) => {
                let Some(z) = elements::element_impedance(schematic, component, overlay, f)? else {
                    continue;
                };
                let y = admittance_of(z);
                if let Some(i) =
                    terminal_index(netlist, &index_of, component, rfcalc_core::Terminal::Start)
                {
                    matrix.add_at(i, i, y);
                }
            }

            ComponentKind::Resistor { .. }
            | ComponentKind::Inductor { .. }
            | ComponentKind::Capacitor { .. } => {
                let kind = overlay.kind_of(component);
                // Lumped kinds always have an impedance model
                let Some(z) = elements::kind_impedance(&kind, f) else {
                    continue;
                };
                let y = admittance_of(z);
                let i = terminal_index(netlist, &index_of, component, rfcalc_core::Terminal::Start);
                let j = terminal_index(netlist, &index_of, component, rfcalc_core::Terminal::End);
                stamp_series(&mut matrix, i, j, y);
            }
        }
    }

    // Regularize floating sub-nets.
    for i in 0..size {
        matrix.add_at(i, i, Complex64::new(GMIN, 0.0));
    }

    Ok(YSystem {
        matrix,
        index_of,
        size,
    })
}

fn terminal_index(
    netlist: &Netlist,
    index_of: &HashMap<NodeId, usize>,
    component: &rfcalc_core::Component,
    terminal: rfcalc_core::Terminal,
) -> Option<usize> {
    netlist
        .node(&component.id, terminal)
        .and_then(|n| index_of.get(&n).copied())
}

/// Series element between nodes `i` and `j`; ground rows are dropped by
/// passing `None`.
fn stamp_series(matrix: &mut CMatrix, i: Option<usize>, j: Option<usize>, y: Complex64) {
    stamp_two_port(matrix, i, j, y, -y, -y, y)
}

/// General two-port stamp with ground dropping.
fn stamp_two_port(
    matrix: &mut CMatrix,
    i: Option<usize>,
    j: Option<usize>,
    y11: Complex64,
    y12: Complex64,
    y21: Complex64,
    y22: Complex64,
) {
    if let Some(i) = i {
        matrix.add_at(i, i, y11);
    }
    if let Some(j) = j {
        matrix.add_at(j, j, y22);
    }
    if let (Some(i), Some(j)) = (i, j) {
        matrix.add_at(i, j, y12);
        matrix.add_at(j, i, y21);
    }
}
