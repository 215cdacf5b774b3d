//! Frequency sweep coordinator.
//!
//! Drives netlist → admittance → S-parameters across a linear or
//! logarithmic frequency grid and accumulates per-port-pair traces
//! (complex S, dB magnitude, phase) plus the port-1 input impedance
//! column. The topology is netlisted once; only `Y(f)` is rebuilt per
//! point.
//!
//! Long runs are cooperative: a shared atomic flag is checked between
//! frequency points and a monotonic progress fraction is reported there.
//! A singular system at one frequency degrades that point to the default
//! reflective S-matrix and the sweep continues, with a diagnostics entry.

use crate::admittance;
use crate::netlist;
use crate::overlay::ParamOverlay;
use crate::sparams;
use num_complex::Complex64;
use rfcalc_core::{db20, phase_deg, Diagnostics, Hertz, RfError, RfResult, Schematic};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Maximum number of points a sweep may request.
pub const MAX_POINTS: usize = 10_000;

/// Spacing of the frequency grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FrequencyScale {
    #[default]
    Linear,
    Logarithmic,
}

/// Sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub start: Hertz,
    pub stop: Hertz,
    /// Number of grid points, 2..=10 000
    pub points: usize,
    pub scale: FrequencyScale,
    /// Reference impedance; `None` reads port 1 (50 Ω default)
    pub z0: Option<f64>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start: Hertz(1.0e6),
            stop: Hertz(1.0e9),
            points: 201,
            scale: FrequencyScale::Linear,
            z0: None,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> RfResult<()> {
        if !(2..=MAX_POINTS).contains(&self.points) {
            return Err(RfError::InvalidInput(format!(
                "sweep needs 2..={} points, got {}",
                MAX_POINTS, self.points
            )));
        }
        if !self.start.is_finite() || !self.stop.is_finite() {
            return Err(RfError::InvalidInput("non-finite sweep bounds".into()));
        }
        if self.start.value() < 0.0 {
            return Err(RfError::InvalidInput(format!(
                "negative start frequency {}",
                self.start
            )));
        }
        if self.stop < self.start {
            return Err(RfError::InvalidInput("sweep stop below start".into()));
        }
        if self.scale == FrequencyScale::Logarithmic && self.start.value() <= 0.0 {
            return Err(RfError::InvalidInput(
                "logarithmic sweep needs a positive start frequency".into(),
            ));
        }
        Ok(())
    }

    /// The frequency grid this configuration describes, ascending.
    pub fn frequency_grid(&self) -> Vec<Hertz> {
        let n = self.points;
        let (a, b) = (self.start.value(), self.stop.value());
        (0..n)
            .map(|k| {
                let t = k as f64 / (n - 1) as f64;
                match self.scale {
                    FrequencyScale::Linear => Hertz(a + t * (b - a)),
                    FrequencyScale::Logarithmic => {
                        let (la, lb) = (a.log10(), b.log10());
                        Hertz(10f64.powf(la + t * (lb - la)))
                    }
                }
            })
            .collect()
    }
}

/// One S_ij trace across the sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trace {
    pub s: Vec<Complex64>,
    /// `20·log10(|S|)`, floored at −100 dB
    pub db: Vec<f64>,
    /// Phase in degrees
    pub phase_deg: Vec<f64>,
}

impl Trace {
    fn push(&mut self, value: Complex64) {
        self.s.push(value);
        self.db.push(db20(value));
        self.phase_deg.push(phase_deg(value).value());
    }
}

/// Accumulated sweep output, frequency-ascending.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub frequencies: Vec<Hertz>,
    pub ports: usize,
    /// Reference impedance the S-parameters are normalized to
    pub z0: f64,
    /// Traces in row-major port order: `(i, j)` at `i * ports + j`
    traces: Vec<Trace>,
    /// Input impedance at port 1, one entry per frequency
    pub input_impedance: Vec<Complex64>,
    /// Soft failures encountered along the way
    pub diagnostics: Diagnostics,
}

impl SweepResult {
    /// Trace for S_ij (0-based port indices).
    pub fn trace(&self, i: usize, j: usize) -> &Trace {
        &self.traces[i * self.ports + j]
    }

    pub fn points(&self) -> usize {
        self.frequencies.len()
    }

    /// VSWR at port 1 for point `k`, from |S11|.
    pub fn vswr_in(&self, k: usize) -> f64 {
        rfcalc_core::vswr(self.trace(0, 0).s[k])
    }
}

/// Run a frequency sweep.
///
/// `progress` receives a monotonic fraction in [0, 1] after each point.
/// Raising `cancel` aborts after the current frequency with
/// [`RfError::Cancelled`]; the schematic is untouched on every exit path.
pub fn sweep(
    schematic: &Schematic,
    config: &SweepConfig,
    mut progress: impl FnMut(f64),
    cancel: &AtomicBool,
) -> RfResult<SweepResult> {
    config.validate()?;

    let nl = netlist::build_netlist(schematic)?;
    let ports = nl.ports.len();
    let z0 = config.z0.unwrap_or_else(|| schematic.system_z0());
    let frequencies = config.frequency_grid();
    let overlay = ParamOverlay::new();

    let mut result = SweepResult {
        frequencies: Vec::with_capacity(frequencies.len()),
        ports,
        z0,
        traces: vec![Trace::default(); ports * ports],
        input_impedance: Vec::with_capacity(frequencies.len()),
        diagnostics: Diagnostics::new(),
    };
    result.diagnostics.merge(nl.diagnostics.clone());

    let total = frequencies.len();
    for (k, f) in frequencies.into_iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            return Err(RfError::Cancelled);
        }

        let ysys = admittance::build_admittance(schematic, &nl, &overlay, f.value())?;
        let analysis = sparams::port_analysis(&ysys, &nl, z0);
        if analysis.degraded {
            result.diagnostics.add_warning_with_entity(
                "numerical",
                "singular system, default S-matrix substituted",
                &format!("f={:.6e} Hz", f.value()),
            );
        }

        for i in 0..ports {
            for j in 0..ports {
                result.traces[i * ports + j].push(analysis.s_param(i, j));
            }
        }
        result.input_impedance.push(analysis.input_impedance());
        result.frequencies.push(f);

        progress((k + 1) as f64 / total as f64);
    }

    Ok(result)
}
