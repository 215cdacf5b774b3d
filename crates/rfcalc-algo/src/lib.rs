//! # rfcalc-algo: RF Circuit Engines
//!
//! The numerical core of the calculator: spatial netlisting, element
//! models, nodal admittance assembly, S-parameter extraction, frequency
//! sweeps, the matching-range traversal, and isolated sub-circuit
//! simulation.
//!
//! ## Pipeline
//!
//! ```text
//! Schematic ──► netlist ──► admittance Y(f) ──► S-parameters ──► sweep
//!                  ▲                                │
//!                  └──────── subcircuit ◄───────────┘
//!                         (integrated blocks)
//! ```
//!
//! The matching-range engine drives the same chain with per-component
//! parameter overlays instead of mutating the schematic.
//!
//! ## Entry points
//!
//! - [`build_netlist`] — geometry to electrical nodes
//! - [`build_admittance`] — netlist to `Y(f)`
//! - [`scattering_at`] — one-shot S-matrix at a frequency
//! - [`sweep`] — full frequency sweep with progress and cancellation
//! - [`matching_range`] — Γ locus over a tuning hypercube
//! - [`input_impedance_at`] — port-1 impedance at a frequency
//! - [`simulate_isolated`] — impedance of a selection outside the circuit

pub mod admittance;
pub mod elements;
pub mod matching;
pub mod netlist;
pub mod overlay;
pub mod sparams;
pub mod subcircuit;
pub mod sweep;

pub use admittance::{build_admittance, YSystem, BIG_ADMITTANCE, GMIN};
pub use elements::{kind_abcd, kind_impedance, tline_abcd, Abcd};
pub use matching::{
    gray_sequence, matching_range, GammaPath, MatchingConfig, PathKind, TuneRange, MAX_TUNED,
};
pub use netlist::{build_netlist, Netlist, NodeId, PortBinding, TOLERANCE};
pub use overlay::ParamOverlay;
pub use sparams::{input_impedance_at, port_analysis, s_to_z, scattering_at, z_to_s, PortAnalysis};
pub use subcircuit::{integrated_impedance, simulate_isolated, IsolatedTarget};
pub use sweep::{sweep, FrequencyScale, SweepConfig, SweepResult, Trace, MAX_POINTS};
