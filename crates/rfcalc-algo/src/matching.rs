//! Matching-range engine: the reflection-coefficient locus reachable by
//! tuning selected components over their ranges.
//!
//! The tuning space is the N-cube spanned by each selected component's
//! `(min, max)` range. Its boundary image in the Γ plane is traced by
//! walking the cube vertices in reflected-binary Gray order, so each hop
//! changes exactly one component, and interpolating that component
//! linearly along the edge. The traversal closes back on its starting
//! vertex, yielding a closed path of `2ⁿ·stepsPerEdge + 1` points
//! (the final point repeats the first).
//!
//! Evaluations go through a [`ParamOverlay`]; the schematic is never
//! written, so tuned values can never leak out of the engine regardless
//! of how it exits.

use crate::admittance;
use crate::netlist;
use crate::overlay::ParamOverlay;
use crate::sparams;
use num_complex::Complex64;
use rfcalc_core::{
    clip_gamma, is_non_finite, Diagnostics, Hertz, RfError, RfResult, Schematic,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Most tunable components a single traversal will accept. The path has
/// 2ⁿ edges, so this already means 65 536 edges.
pub const MAX_TUNED: usize = 16;

/// One tunable component with its value range in SI units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuneRange {
    pub component: String,
    pub min: f64,
    pub max: f64,
}

impl TuneRange {
    /// Default range for a component: its slider range for the tunable
    /// parameter. `None` when the component is not tunable or carries no
    /// slider range.
    pub fn from_component(component: &rfcalc_core::Component) -> Option<Self> {
        let param = component.kind.primary_param()?;
        let range = component.slider_ranges.get(param)?;
        Some(Self {
            component: component.id.clone(),
            min: range.min,
            max: range.max,
        })
    }
}

/// Matching-range run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Center frequency the locus is evaluated at
    pub frequency: Hertz,
    /// Interpolation steps along each cube edge, ≥ 1
    pub steps_per_edge: usize,
    /// Mirror the locus across the real axis (negate Im Γ)
    pub invert_reactance: bool,
    /// Reference impedance; `None` reads port 1
    pub z0: Option<f64>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            frequency: Hertz(100.0e6),
            steps_per_edge: 10,
            invert_reactance: false,
            z0: None,
        }
    }
}

/// Shape of the tuning space, by dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PathKind {
    Line,
    Rectangle,
    Cube,
    Hypercube(usize),
}

impl PathKind {
    fn for_dimension(n: usize) -> Self {
        match n {
            1 => PathKind::Line,
            2 => PathKind::Rectangle,
            3 => PathKind::Cube,
            n => PathKind::Hypercube(n),
        }
    }
}

/// The traced locus.
#[derive(Debug, Clone, Serialize)]
pub struct GammaPath {
    /// Closed Γ path; the last point equals the first
    pub points: Vec<Complex64>,
    /// Frequency the path was evaluated at
    pub frequency: Hertz,
    /// Component ids in traversal bit order
    pub components: Vec<String>,
    /// Γ of the circuit with nothing tuned (the current operating point)
    pub reference: Complex64,
    /// Reference impedance used for normalization
    pub z0: f64,
    pub kind: PathKind,
    /// Clipped evaluations and other soft events
    pub diagnostics: Diagnostics,
}

/// Reflected-binary Gray sequence over `bits` bits, closed: the first
/// code is appended again at the end, so consecutive entries (including
/// the wrap) differ in exactly one bit.
pub fn gray_sequence(bits: usize) -> Vec<u64> {
    let count = 1u64 << bits;
    let mut seq: Vec<u64> = (0..count).map(|k| k ^ (k >> 1)).collect();
    seq.push(seq[0]);
    seq
}

/// Trace the matching range of `selection` at the configured frequency.
///
/// `progress` receives a monotonic fraction in [0, 1] after each Gray
/// edge; `cancel` is honoured between edges.
pub fn matching_range(
    schematic: &Schematic,
    selection: &[TuneRange],
    config: &MatchingConfig,
    mut progress: impl FnMut(f64),
    cancel: &AtomicBool,
) -> RfResult<GammaPath> {
    let n = selection.len();
    if n == 0 {
        return Err(RfError::InvalidInput("no components selected".into()));
    }
    if n > MAX_TUNED {
        return Err(RfError::InvalidInput(format!(
            "{} components selected, at most {} supported",
            n, MAX_TUNED
        )));
    }
    if config.steps_per_edge == 0 {
        return Err(RfError::InvalidInput("zero steps per edge".into()));
    }
    let f = config.frequency.value();
    if !(f.is_finite() && f >= 0.0) {
        return Err(RfError::InvalidInput(format!("bad frequency {f} Hz")));
    }
    for range in selection {
        let component = schematic.components.get(&range.component).ok_or_else(|| {
            RfError::InvalidInput(format!("unknown component {}", range.component))
        })?;
        if component.kind.primary_param().is_none() {
            return Err(RfError::InvalidInput(format!(
                "component {} has no tunable parameter",
                range.component
            )));
        }
        if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
            return Err(RfError::InvalidInput(format!(
                "bad range [{}, {}] on {}",
                range.min, range.max, range.component
            )));
        }
    }

    let nl = netlist::build_netlist(schematic)?;
    let z0 = config.z0.unwrap_or_else(|| schematic.system_z0());
    let mut diagnostics = Diagnostics::new();

    let vertex_value = |sel: &TuneRange, code: u64, bit: usize| -> f64 {
        if code & (1 << bit) != 0 {
            sel.max
        } else {
            sel.min
        }
    };

    let evaluate = |overlay: &ParamOverlay,
                    diagnostics: &mut Diagnostics|
     -> RfResult<Complex64> {
        let ysys = admittance::build_admittance(schematic, &nl, overlay, f)?;
        let analysis = sparams::port_analysis(&ysys, &nl, z0);
        if analysis.degraded {
            diagnostics.add_warning(
                "numerical",
                "singular system during tuning, default S substituted",
            );
        }
        let mut gamma = analysis.s_param(0, 0);
        if config.invert_reactance {
            gamma = gamma.conj();
        }
        if is_non_finite(gamma) {
            diagnostics.add_warning("numerical", "non-finite Γ clipped to the unit circle");
            gamma = clip_gamma(gamma);
        }
        Ok(gamma)
    };

    // Operating point with nothing tuned.
    let reference = evaluate(&ParamOverlay::new(), &mut diagnostics)?;

    let gray = gray_sequence(n);
    let edges = gray.len() - 1;
    let steps = config.steps_per_edge;
    let mut points: Vec<Complex64> = Vec::with_capacity(edges * steps + 1);

    // Starting vertex (all components at min, since g[0] = 0).
    let mut overlay = ParamOverlay::new();
    for (bit, sel) in selection.iter().enumerate() {
        overlay.set(sel.component.clone(), vertex_value(sel, gray[0], bit));
    }
    points.push(evaluate(&overlay, &mut diagnostics)?);

    for e in 0..edges {
        if cancel.load(Ordering::Relaxed) {
            return Err(RfError::Cancelled);
        }

        let (from_code, to_code) = (gray[e], gray[e + 1]);
        let moving_bit = (from_code ^ to_code).trailing_zeros() as usize;
        let moving = &selection[moving_bit];
        let from = vertex_value(moving, from_code, moving_bit);
        let to = vertex_value(moving, to_code, moving_bit);

        let mut overlay = ParamOverlay::new();
        for (bit, sel) in selection.iter().enumerate() {
            if bit != moving_bit {
                overlay.set(sel.component.clone(), vertex_value(sel, from_code, bit));
            }
        }

        // The edge start itself was emitted by the previous edge (or the
        // seed point), so begin one step in.
        for s in 1..=steps {
            let t = s as f64 / steps as f64;
            overlay.set(moving.component.clone(), from + t * (to - from));
            points.push(evaluate(&overlay, &mut diagnostics)?);
        }

        progress((e + 1) as f64 / edges as f64);
    }

    Ok(GammaPath {
        points,
        frequency: config.frequency,
        components: selection.iter().map(|s| s.component.clone()).collect(),
        reference,
        z0,
        kind: PathKind::for_dimension(n),
        diagnostics,
    })
}
