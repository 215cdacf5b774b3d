//! # rfcalc-core: RF Circuit Model Core
//!
//! Data structures shared by the whole workspace: the schematic (components
//! and wires placed on a 20-unit canvas grid), typed component parameter
//! records, canvas geometry, unit newtypes, the dense complex matrix used
//! by the admittance solver, diagnostics, and the unified error type.
//!
//! ## Design notes
//!
//! - Components and wires are stored in ordered maps keyed by their string
//!   ids (`"R_3"`, `"wire_7"`). The ids are part of the persisted document
//!   contract, and id generation is gap-filling: the next `R` id after
//!   deleting `R_2` from `{R_1, R_2, R_3}` is `R_2` again.
//! - Electrical connectivity is **not** stored here. Wires carry advisory
//!   endpoint hints from the editor, but the netlister derives nodes
//!   purely from geometry, so the hints are never authoritative.
//! - Parameters are a sum type over component kinds, each variant carrying
//!   a typed record. There is no string-keyed parameter bag.
//!
//! ## Quick start
//!
//! ```rust
//! use rfcalc_core::*;
//!
//! let mut sch = Schematic::new();
//! sch.add_component(Component::new(
//!     "PORT_1",
//!     ComponentKind::Port(PortParams { number: 1, impedance: 50.0 }),
//!     100.0,
//!     80.0,
//! ));
//! sch.add_component(Component::new(
//!     "R_1",
//!     ComponentKind::Resistor { resistance: 50.0 },
//!     140.0,
//!     80.0,
//! ));
//! sch.add_wire(Wire::new("wire_1", 100.0, 80.0, 120.0, 80.0));
//!
//! assert_eq!(sch.next_component_id("R"), "R_2");
//! ```

pub mod cnum;
pub mod diagnostics;
pub mod error;
pub mod geom;
pub mod matrix;
pub mod units;

pub use cnum::{clip_gamma, db20, gamma_to_z, is_non_finite, phase_deg, vswr, z_to_gamma, DB_FLOOR};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{NumericalError, RfError, RfResult, TopologyError};
pub use geom::{point_segment_distance, Point, Rotation, GRID};
pub use matrix::{CMatrix, PIVOT_EPS};
pub use num_complex::Complex64;
pub use units::{Degrees, Hertz, Ohms, Radians};

use std::collections::BTreeMap;

/// Default system reference impedance in ohms.
pub const DEFAULT_Z0: f64 = 50.0;

/// Highest port number the engine supports.
pub const MAX_PORTS: usize = 4;

/// A terminal of a component. Two-terminal elements expose `Start` and
/// `End`; one-terminal elements (ground, port, integrated blocks) expose
/// only `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Terminal {
    Start,
    End,
}

impl Terminal {
    pub fn name(self) -> &'static str {
        match self {
            Terminal::Start => "start",
            Terminal::End => "end",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Terminal::Start),
            "end" => Some(Terminal::End),
            _ => None,
        }
    }
}

impl std::fmt::Display for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Key identifying one component terminal, `"<componentId>:<terminal>"`.
/// This is the key space of the netlister's terminal → node map.
pub fn terminal_key(component_id: &str, terminal: Terminal) -> String {
    format!("{}:{}", component_id, terminal.name())
}

/// Reference to a terminal of some other component, used by integrated
/// blocks to mark their internal input and ground attachment points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalRef {
    pub component: String,
    pub terminal: Terminal,
}

/// Port parameters: 1-based port number and reference impedance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortParams {
    pub number: u8,
    /// Reference impedance in ohms
    pub impedance: f64,
}

/// Transmission-line parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TlineParams {
    /// Characteristic impedance, real part (Ω)
    pub z0: f64,
    /// Characteristic impedance, imaginary part (Ω); 0 for a lossless line
    pub z0_imag: f64,
    /// Physical length (m)
    pub length: f64,
    /// Phase velocity (m/s)
    pub velocity: f64,
    /// Loss in dB per unit length; 0 for a lossless line
    pub loss_db: f64,
}

impl Default for TlineParams {
    fn default() -> Self {
        Self {
            z0: DEFAULT_Z0,
            z0_imag: 0.0,
            length: 0.1,
            velocity: 3.0e8,
            loss_db: 0.0,
        }
    }
}

/// An integrated block: a named subset of the schematic that behaves as a
/// one-port element. Its impedance is obtained by simulating the subset
/// with the configured input terminal driven and the configured ground
/// terminal grounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SubBlock {
    /// Component ids contained in the block
    pub components: Vec<String>,
    /// Wire ids contained in the block
    pub wires: Vec<String>,
    /// Terminal driven by the synthetic port
    pub input: TerminalRef,
    /// Terminal tied to the synthetic ground
    pub ground: TerminalRef,
}

/// Component kind with its typed parameter record.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentKind {
    Resistor {
        /// Resistance in ohms
        resistance: f64,
    },
    Inductor {
        /// Inductance in henries
        inductance: f64,
    },
    Capacitor {
        /// Capacitance in farads
        capacitance: f64,
    },
    Ground,
    Port(PortParams),
    TransmissionLine(TlineParams),
    Integrated(SubBlock),
}

impl ComponentKind {
    /// Short tag used in ids and the persisted document (`"R"`, `"TL"`, ...).
    pub fn tag(&self) -> &'static str {
        match self {
            ComponentKind::Resistor { .. } => "R",
            ComponentKind::Inductor { .. } => "L",
            ComponentKind::Capacitor { .. } => "C",
            ComponentKind::Ground => "GND",
            ComponentKind::Port(_) => "PORT",
            ComponentKind::TransmissionLine(_) => "TL",
            ComponentKind::Integrated(_) => "INT",
        }
    }

    /// Terminals this kind exposes, in order.
    pub fn terminals(&self) -> &'static [Terminal] {
        match self {
            ComponentKind::Resistor { .. }
            | ComponentKind::Inductor { .. }
            | ComponentKind::Capacitor { .. }
            | ComponentKind::TransmissionLine(_) => &[Terminal::Start, Terminal::End],
            ComponentKind::Ground | ComponentKind::Port(_) | ComponentKind::Integrated(_) => {
                &[Terminal::Start]
            }
        }
    }

    /// True for elements stamped as a shunt to ground on their start node.
    pub fn is_one_port(&self) -> bool {
        matches!(self, ComponentKind::Integrated(_))
    }

    /// Name of the tunable parameter, if this kind has one.
    pub fn primary_param(&self) -> Option<&'static str> {
        match self {
            ComponentKind::Resistor { .. } => Some("resistance"),
            ComponentKind::Inductor { .. } => Some("inductance"),
            ComponentKind::Capacitor { .. } => Some("capacitance"),
            ComponentKind::TransmissionLine(_) => Some("length"),
            _ => None,
        }
    }

    /// Value of the tunable parameter, if this kind has one.
    pub fn primary_value(&self) -> Option<f64> {
        match self {
            ComponentKind::Resistor { resistance } => Some(*resistance),
            ComponentKind::Inductor { inductance } => Some(*inductance),
            ComponentKind::Capacitor { capacitance } => Some(*capacitance),
            ComponentKind::TransmissionLine(tl) => Some(tl.length),
            _ => None,
        }
    }

    /// Copy of this kind with the tunable parameter replaced. Kinds
    /// without one are returned unchanged.
    pub fn with_primary_value(&self, value: f64) -> ComponentKind {
        match self {
            ComponentKind::Resistor { .. } => ComponentKind::Resistor { resistance: value },
            ComponentKind::Inductor { .. } => ComponentKind::Inductor { inductance: value },
            ComponentKind::Capacitor { .. } => ComponentKind::Capacitor { capacitance: value },
            ComponentKind::TransmissionLine(tl) => {
                let mut tl = *tl;
                tl.length = value;
                ComponentKind::TransmissionLine(tl)
            }
            other => other.clone(),
        }
    }
}

/// Allowed range for a tunable parameter (SI units).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

/// Which terminals to drive and ground when a component is simulated in
/// isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoConfig {
    pub input: Terminal,
    pub ground: Terminal,
}

impl Default for IsoConfig {
    fn default() -> Self {
        Self {
            input: Terminal::Start,
            ground: Terminal::End,
        }
    }
}

/// A placed schematic component.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    /// Anchor position on the canvas
    pub position: Point,
    pub rotation: Rotation,
    /// Optional slider range per parameter name
    pub slider_ranges: BTreeMap<String, ParamRange>,
    /// Terminal roles for isolated simulation
    pub iso: Option<IsoConfig>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            position: Point::new(x, y),
            rotation: Rotation::R0,
            slider_ranges: BTreeMap::new(),
            iso: None,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_slider_range(mut self, param: &str, min: f64, max: f64) -> Self {
        self.slider_ranges
            .insert(param.to_string(), ParamRange { min, max });
        self
    }

    pub fn with_iso(mut self, iso: IsoConfig) -> Self {
        self.iso = Some(iso);
        self
    }

    /// Terminal offset from the anchor before rotation. Two-terminal
    /// elements span one grid cell on each side; one-terminal elements
    /// sit on their anchor.
    pub fn terminal_offset(&self, terminal: Terminal) -> (f64, f64) {
        if self.kind.terminals().len() == 1 {
            (0.0, 0.0)
        } else {
            match terminal {
                Terminal::Start => (-GRID, 0.0),
                Terminal::End => (GRID, 0.0),
            }
        }
    }

    /// Absolute canvas position of a terminal.
    pub fn terminal_position(&self, terminal: Terminal) -> Point {
        let (dx, dy) = self.terminal_offset(terminal);
        let (dx, dy) = self.rotation.apply(dx, dy);
        Point::new(self.position.x + dx, self.position.y + dy)
    }

    /// All terminals with their absolute positions.
    pub fn terminal_positions(&self) -> Vec<(Terminal, Point)> {
        self.kind
            .terminals()
            .iter()
            .map(|&t| (t, self.terminal_position(t)))
            .collect()
    }
}

/// A wire segment on the canvas. Endpoint component/terminal hints come
/// from the editor and are advisory; connectivity is derived spatially.
#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub id: String,
    pub start: Point,
    pub end: Point,
    pub start_hint: Option<TerminalRef>,
    pub end_hint: Option<TerminalRef>,
}

impl Wire {
    pub fn new(id: impl Into<String>, x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            id: id.into(),
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
            start_hint: None,
            end_hint: None,
        }
    }
}

/// The schematic: components and wires in separate id namespaces.
///
/// Ordered maps keep every traversal deterministic, which in turn keeps
/// node numbering and sweep output bit-identical across runs.
#[derive(Debug, Clone, Default)]
pub struct Schematic {
    pub components: BTreeMap<String, Component>,
    pub wires: BTreeMap<String, Wire>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a component, replacing any existing one with the same id.
    pub fn add_component(&mut self, component: Component) {
        self.components.insert(component.id.clone(), component);
    }

    /// Insert a wire, replacing any existing one with the same id.
    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.insert(wire.id.clone(), wire);
    }

    /// Next free component id for a kind prefix: the smallest positive
    /// integer `n` such that `<prefix>_<n>` is unused.
    pub fn next_component_id(&self, prefix: &str) -> String {
        next_gap_id(prefix, self.components.keys())
    }

    /// Next free wire id (`wire_<n>` namespace).
    pub fn next_wire_id(&self) -> String {
        next_gap_id("wire", self.wires.keys())
    }

    /// All port components, sorted by declared port number.
    pub fn ports(&self) -> Vec<&Component> {
        let mut ports: Vec<&Component> = self
            .components
            .values()
            .filter(|c| matches!(c.kind, ComponentKind::Port(_)))
            .collect();
        ports.sort_by_key(|c| match &c.kind {
            ComponentKind::Port(p) => p.number,
            _ => unreachable!(),
        });
        ports
    }

    /// All ground components.
    pub fn grounds(&self) -> Vec<&Component> {
        self.components
            .values()
            .filter(|c| matches!(c.kind, ComponentKind::Ground))
            .collect()
    }

    /// Reference impedance of port 1, or the 50 Ω default.
    pub fn system_z0(&self) -> f64 {
        self.ports()
            .first()
            .and_then(|c| match &c.kind {
                ComponentKind::Port(p) => Some(p.impedance),
                _ => None,
            })
            .unwrap_or(DEFAULT_Z0)
    }

    /// Absolute position of a terminal, if the component exists and has it.
    pub fn terminal_position(&self, component_id: &str, terminal: Terminal) -> Option<Point> {
        let component = self.components.get(component_id)?;
        if component.kind.terminals().contains(&terminal) {
            Some(component.terminal_position(terminal))
        } else {
            None
        }
    }

    /// Compute basic statistics about the schematic.
    pub fn stats(&self) -> SchematicStats {
        let mut stats = SchematicStats::default();
        for component in self.components.values() {
            match &component.kind {
                ComponentKind::Port(_) => stats.num_ports += 1,
                ComponentKind::Ground => stats.num_grounds += 1,
                _ => {}
            }
            if component.kind.primary_param().is_some() {
                stats.num_tunable += 1;
            }
        }
        stats.num_components = self.components.len();
        stats.num_wires = self.wires.len();
        stats
    }

    /// Pre-flight validation for issues that make a sweep fail outright.
    /// Connectivity-sensitive checks are repeated (authoritatively) by the
    /// netlister; this is the cheap early warning for editors.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();

        if stats.num_components == 0 {
            diag.add_error("structure", "Schematic has no components");
            return;
        }
        if stats.num_ports == 0 {
            diag.add_error("topology", "Schematic has no port");
        }
        if stats.num_ports > MAX_PORTS {
            diag.add_error(
                "topology",
                &format!(
                    "Schematic has {} ports, at most {} supported",
                    stats.num_ports, MAX_PORTS
                ),
            );
        }
        if stats.num_grounds == 0 {
            diag.add_error("topology", "Schematic has no ground");
        }

        let mut seen = std::collections::BTreeMap::new();
        for port in self.ports() {
            if let ComponentKind::Port(p) = &port.kind {
                if let Some(first) = seen.insert(p.number, port.id.clone()) {
                    diag.add_error_with_entity(
                        "topology",
                        &format!("Port number {} also used by {}", p.number, first),
                        &port.id,
                    );
                }
            }
        }

        if stats.num_wires == 0 && stats.num_components > 1 {
            diag.add_warning("structure", "Schematic has multiple components but no wires");
        }
    }
}

/// Counts reported by [`Schematic::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchematicStats {
    pub num_components: usize,
    pub num_wires: usize,
    pub num_ports: usize,
    pub num_grounds: usize,
    pub num_tunable: usize,
}

impl std::fmt::Display for SchematicStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} components ({} ports, {} grounds), {} wires",
            self.num_components, self.num_ports, self.num_grounds, self.num_wires
        )
    }
}

/// Gap-filled id generation over one namespace: the smallest `n >= 1` with
/// `<prefix>_<n>` absent from `used`.
fn next_gap_id<'a>(prefix: &str, used: impl Iterator<Item = &'a String>) -> String {
    let head = format!("{}_", prefix);
    let mut taken: Vec<u64> = used
        .filter_map(|id| id.strip_prefix(&head))
        .filter_map(|n| n.parse::<u64>().ok())
        .collect();
    taken.sort_unstable();
    taken.dedup();
    let mut next = 1u64;
    for n in taken {
        if n == next {
            next += 1;
        } else if n > next {
            break;
        }
    }
    format!("{}_{}", prefix, next)
}
