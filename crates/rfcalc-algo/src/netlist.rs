//! Spatial netlister: from canvas geometry to electrical nodes.
//!
//! Nothing in the schematic stores connectivity. Wires are bare segments
//! and components are anchored glyphs, so the node partition is inferred
//! from geometry alone:
//!
//! 1. Wires touching each other (endpoint–endpoint or endpoint on the
//!    interior of another segment, the T-junction case) are unioned into
//!    wire nets; each net becomes one node.
//! 2. Component terminals are assigned to the first net whose segment they
//!    touch; terminals touching nothing get a fresh node each.
//! 3. Terminals that coincide with each other without any wire merge
//!    their nodes, so the final partition does not depend on which net a
//!    shared terminal was seeded from.
//! 4. All ground terminals fold into a single ground node; ports are
//!    ordered by their declared number and checked.
//!
//! Editors may cache `(component, terminal)` hints on wire endpoints;
//! those are advisory. A hint that disagrees with the spatial result is
//! reported as a warning, never believed.

use petgraph::unionfind::UnionFind;
use rfcalc_core::{
    point_segment_distance, terminal_key, ComponentKind, Diagnostics, Point, Schematic, Terminal,
    TopologyError, Wire,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Electrical node handle. Consecutive from zero with holes allowed after
/// merges; only the partition matters.
pub type NodeId = usize;

/// Spatial tolerance in canvas units: positions closer than this connect.
pub const TOLERANCE: f64 = 5.0;

/// A port together with the node its terminal resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct PortBinding {
    /// Declared 1-based port number
    pub number: u8,
    /// Component id of the port element
    pub component: String,
    /// Node of the port terminal
    pub node: NodeId,
    /// Reference impedance in ohms
    pub impedance: f64,
}

/// Result of the spatial netlisting pass.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    /// Terminal key (`"R_3:start"`) → node
    node_of: HashMap<String, NodeId>,
    /// The single ground node
    pub ground: NodeId,
    /// Ports sorted by declared number
    pub ports: Vec<PortBinding>,
    /// Advisory findings (hint mismatches, merged grounds)
    pub diagnostics: Diagnostics,
}

impl Netlist {
    /// Node of a component terminal, if that terminal exists.
    pub fn node(&self, component_id: &str, terminal: Terminal) -> Option<NodeId> {
        self.node_of
            .get(&terminal_key(component_id, terminal))
            .copied()
    }

    /// All distinct node ids, ascending.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let set: BTreeSet<NodeId> = self.node_of.values().copied().collect();
        set.into_iter().collect()
    }

    /// Node ids excluding ground, ascending. These become admittance
    /// matrix rows.
    pub fn non_ground_nodes(&self) -> Vec<NodeId> {
        self.node_ids()
            .into_iter()
            .filter(|&n| n != self.ground)
            .collect()
    }

    /// Number of terminals mapped (diagnostic aid).
    pub fn terminal_count(&self) -> usize {
        self.node_of.len()
    }
}

/// Wires are adjacent when endpoints coincide or one endpoint lies on the
/// other segment within [`TOLERANCE`].
fn wires_adjacent(a: &Wire, b: &Wire) -> bool {
    let tol_sq = TOLERANCE * TOLERANCE;
    let ends_a = [a.start, a.end];
    let ends_b = [b.start, b.end];
    for pa in ends_a {
        for pb in ends_b {
            if pa.distance_sq(pb) < tol_sq {
                return true;
            }
        }
    }
    // T-junctions: an endpoint on the interior of the other segment
    ends_a
        .iter()
        .any(|&p| point_segment_distance(p, b.start, b.end) < TOLERANCE)
        || ends_b
            .iter()
            .any(|&p| point_segment_distance(p, a.start, a.end) < TOLERANCE)
}

fn touches_wire(p: Point, wire: &Wire) -> bool {
    point_segment_distance(p, wire.start, wire.end) < TOLERANCE
}

/// Derive the node partition for a schematic.
///
/// Components and wires interior to an integrated block are skipped; the
/// block itself stands in for them as a one-port element.
pub fn build_netlist(schematic: &Schematic) -> Result<Netlist, TopologyError> {
    let mut diagnostics = Diagnostics::new();

    let (interior_components, interior_wires) = interior_ids(schematic);
    let wires: Vec<&Wire> = schematic
        .wires
        .values()
        .filter(|w| !interior_wires.contains(&w.id))
        .collect();

    // Pass 1: union wires into nets by geometric adjacency.
    let mut uf: UnionFind<usize> = UnionFind::new(wires.len());
    for i in 0..wires.len() {
        for j in (i + 1)..wires.len() {
            if wires_adjacent(wires[i], wires[j]) {
                uf.union(i, j);
            }
        }
    }

    // One node per wire net, numbered in first-appearance order.
    let mut net_node: HashMap<usize, NodeId> = HashMap::new();
    let mut next_node: NodeId = 0;
    let mut wire_node: Vec<NodeId> = Vec::with_capacity(wires.len());
    for i in 0..wires.len() {
        let root = uf.find(i);
        let node = *net_node.entry(root).or_insert_with(|| {
            let n = next_node;
            next_node += 1;
            n
        });
        wire_node.push(node);
    }

    // Pass 2 + 3: seed terminals from the first touching wire, fresh
    // nodes for dangling terminals.
    let mut node_of: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut positions: BTreeMap<String, Point> = BTreeMap::new();
    let mut wire_fed: BTreeSet<String> = BTreeSet::new();
    for component in schematic.components.values() {
        if interior_components.contains(&component.id) {
            continue;
        }
        for (terminal, position) in component.terminal_positions() {
            let key = terminal_key(&component.id, terminal);
            let node = match wires.iter().position(|w| touches_wire(position, w)) {
                Some(idx) => {
                    wire_fed.insert(key.clone());
                    wire_node[idx]
                }
                None => {
                    let n = next_node;
                    next_node += 1;
                    n
                }
            };
            positions.insert(key.clone(), position);
            node_of.insert(key, node);
        }
    }

    // Pass 4: terminals that coincide without a wire merge their nodes.
    // Doing this after seeding makes the partition independent of which
    // overlapping net a terminal happened to be seeded from.
    let keys: Vec<String> = node_of.keys().cloned().collect();
    let tol_sq = TOLERANCE * TOLERANCE;
    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            let (a, b) = (&keys[i], &keys[j]);
            let (na, nb) = (node_of[a], node_of[b]);
            if na == nb {
                continue;
            }
            if positions[a].distance_sq(positions[b]) < tol_sq {
                merge_nodes(&mut node_of, na.min(nb), na.max(nb));
            }
        }
    }

    // Pass 5: fold every ground terminal into one ground node.
    let grounds = schematic.grounds();
    if grounds.is_empty() {
        return Err(TopologyError::NoGround);
    }
    let ground_keys: Vec<String> = grounds
        .iter()
        .map(|g| terminal_key(&g.id, Terminal::Start))
        .collect();
    let ground_connected = ground_keys.iter().any(|key| {
        wire_fed.contains(key)
            || node_of
                .iter()
                .any(|(other, &n)| other != key && n == node_of[key])
    });
    if !ground_connected {
        return Err(TopologyError::GroundNotConnected);
    }
    let ground = match ground_keys.iter().map(|k| node_of[k]).min() {
        Some(node) => node,
        None => return Err(TopologyError::NoGround),
    };
    for key in &ground_keys {
        let n = node_of[key];
        if n != ground {
            merge_nodes(&mut node_of, ground, n);
        }
    }
    if grounds.len() > 1 {
        diagnostics.add_warning(
            "topology",
            &format!("{} ground symbols merged into one node", grounds.len()),
        );
    }

    // Pass 6: order ports and validate.
    let ports = schematic.ports();
    if ports.is_empty() {
        return Err(TopologyError::NoPort);
    }
    if ports.len() > rfcalc_core::MAX_PORTS {
        return Err(TopologyError::TooManyPorts(ports.len()));
    }
    let mut bindings = Vec::with_capacity(ports.len());
    let mut seen_numbers = BTreeSet::new();
    for port in ports {
        let params = match &port.kind {
            ComponentKind::Port(p) => p,
            _ => unreachable!("ports() returns only port components"),
        };
        if !seen_numbers.insert(params.number) {
            return Err(TopologyError::DuplicatePortNumber(params.number));
        }
        let key = terminal_key(&port.id, Terminal::Start);
        let node = match node_of.get(&key) {
            Some(&n) => n,
            None => return Err(TopologyError::PortNotConnected(params.number)),
        };
        if node == ground {
            return Err(TopologyError::PortNotConnected(params.number));
        }
        bindings.push(PortBinding {
            number: params.number,
            component: port.id.clone(),
            node,
            impedance: params.impedance,
        });
    }

    // Advisory: editor hints that disagree with the spatial result. The
    // hinted terminal must actually touch the wire that claims it.
    for wire in &wires {
        for hint in [&wire.start_hint, &wire.end_hint].into_iter().flatten() {
            let key = terminal_key(&hint.component, hint.terminal);
            let agrees = positions
                .get(&key)
                .map(|&p| touches_wire(p, wire))
                .unwrap_or(false);
            if !agrees {
                diagnostics.add_warning_with_entity(
                    "hints",
                    &format!(
                        "endpoint hint {}:{} does not match spatial connectivity",
                        hint.component, hint.terminal
                    ),
                    &wire.id,
                );
            }
        }
    }

    Ok(Netlist {
        node_of: node_of.into_iter().collect(),
        ground,
        ports: bindings,
        diagnostics,
    })
}

/// Rewrite all occurrences of `from` to `keep` in the terminal map.
fn merge_nodes(node_of: &mut BTreeMap<String, NodeId>, keep: NodeId, from: NodeId) {
    for node in node_of.values_mut() {
        if *node == from {
            *node = keep;
        }
    }
}

/// Ids of components and wires contained inside integrated blocks.
pub fn interior_ids(schematic: &Schematic) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut components = BTreeSet::new();
    let mut wires = BTreeSet::new();
    for component in schematic.components.values() {
        if let ComponentKind::Integrated(block) = &component.kind {
            components.extend(block.components.iter().cloned());
            wires.extend(block.wires.iter().cloned());
        }
    }
    (components, wires)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfcalc_core::{Component, ComponentKind, PortParams, Schematic, Wire};

    fn port(id: &str, number: u8, x: f64, y: f64) -> Component {
        Component::new(
            id,
            ComponentKind::Port(PortParams {
                number,
                impedance: 50.0,
            }),
            x,
            y,
        )
    }

    fn gnd(id: &str, x: f64, y: f64) -> Component {
        Component::new(id, ComponentKind::Ground, x, y)
    }

    fn resistor(id: &str, x: f64, y: f64) -> Component {
        Component::new(id, ComponentKind::Resistor { resistance: 50.0 }, x, y)
    }

    /// Port 1 -- R -- ground, connected with two wires.
    fn series_circuit() -> Schematic {
        let mut sch = Schematic::new();
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(resistor("R_1", 60.0, 0.0));
        sch.add_component(gnd("GND_1", 140.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        sch.add_wire(Wire::new("wire_2", 80.0, 0.0, 140.0, 0.0));
        sch
    }

    #[test]
    fn test_series_circuit_nodes() {
        let netlist = build_netlist(&series_circuit()).unwrap();
        let port_node = netlist.node("PORT_1", Terminal::Start).unwrap();
        let r_start = netlist.node("R_1", Terminal::Start).unwrap();
        let r_end = netlist.node("R_1", Terminal::End).unwrap();
        assert_eq!(port_node, r_start);
        assert_eq!(r_end, netlist.ground);
        assert_ne!(port_node, netlist.ground);
        assert_eq!(netlist.ports.len(), 1);
        assert_eq!(netlist.ports[0].node, port_node);
    }

    #[test]
    fn test_t_junction_connects() {
        let mut sch = series_circuit();
        // A wire whose endpoint lands on the interior of wire_1, tying the
        // port net straight to ground. The netlister must see the short.
        sch.add_wire(Wire::new("wire_3", 20.0, 0.0, 20.0, 80.0));
        sch.add_component(gnd("GND_2", 20.0, 80.0));
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::PortNotConnected(1));
    }

    #[test]
    fn test_terminal_contact_without_wire() {
        let mut sch = Schematic::new();
        // R_1 end terminal at (80, 0) coincides with R_2 start terminal
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(resistor("R_1", 60.0, 0.0));
        sch.add_component(resistor("R_2", 100.0, 0.0));
        sch.add_component(gnd("GND_1", 160.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        sch.add_wire(Wire::new("wire_2", 120.0, 0.0, 160.0, 0.0));
        let netlist = build_netlist(&sch).unwrap();
        assert_eq!(
            netlist.node("R_1", Terminal::End),
            netlist.node("R_2", Terminal::Start)
        );
    }

    #[test]
    fn test_dangling_terminals_get_distinct_nodes() {
        let mut sch = Schematic::new();
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(resistor("R_1", 300.0, 300.0));
        sch.add_component(gnd("GND_1", 100.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 100.0, 0.0));
        let netlist = build_netlist(&sch).unwrap();
        let r_start = netlist.node("R_1", Terminal::Start).unwrap();
        let r_end = netlist.node("R_1", Terminal::End).unwrap();
        assert_ne!(r_start, r_end);
        assert_ne!(r_start, netlist.ground);
    }

    #[test]
    fn test_ground_folding() {
        let mut sch = series_circuit();
        sch.add_component(gnd("GND_2", 140.0, 0.0));
        let netlist = build_netlist(&sch).unwrap();
        assert_eq!(
            netlist.node("GND_1", Terminal::Start),
            netlist.node("GND_2", Terminal::Start)
        );
        assert_eq!(netlist.node("GND_1", Terminal::Start), Some(netlist.ground));
        assert!(netlist.diagnostics.warning_count() > 0);
    }

    #[test]
    fn test_no_port() {
        let mut sch = Schematic::new();
        sch.add_component(resistor("R_1", 60.0, 0.0));
        sch.add_component(gnd("GND_1", 80.0, 0.0));
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::NoPort);
    }

    #[test]
    fn test_no_ground() {
        let mut sch = Schematic::new();
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(resistor("R_1", 60.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::NoGround);
    }

    #[test]
    fn test_ground_not_connected() {
        let mut sch = Schematic::new();
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(gnd("GND_1", 500.0, 500.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::GroundNotConnected);
    }

    #[test]
    fn test_duplicate_port_numbers() {
        let mut sch = series_circuit();
        sch.add_component(port("PORT_2", 1, 0.0, 100.0));
        sch.add_wire(Wire::new("wire_9", 0.0, 100.0, 140.0, 0.0));
        assert_eq!(
            build_netlist(&sch).unwrap_err(),
            TopologyError::DuplicatePortNumber(1)
        );
    }

    #[test]
    fn test_too_many_ports() {
        let mut sch = series_circuit();
        for n in 2..=5u8 {
            let y = f64::from(n) * 100.0;
            sch.add_component(port(&format!("PORT_{}", n), n, 0.0, y));
            sch.add_wire(Wire::new(
                &format!("wire_{}", 10 + n),
                0.0,
                y,
                40.0,
                y,
            ));
        }
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::TooManyPorts(5));
    }

    #[test]
    fn test_port_shorted_to_ground_rejected() {
        let mut sch = Schematic::new();
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        sch.add_component(gnd("GND_1", 40.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        assert_eq!(build_netlist(&sch).unwrap_err(), TopologyError::PortNotConnected(1));
    }

    #[test]
    fn test_input_order_invariance() {
        // Same circuit, wires and components inserted in reverse order:
        // the terminal partition must be identical.
        let a = build_netlist(&series_circuit()).unwrap();

        let mut sch = Schematic::new();
        sch.add_wire(Wire::new("wire_2", 80.0, 0.0, 140.0, 0.0));
        sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
        sch.add_component(gnd("GND_1", 140.0, 0.0));
        sch.add_component(resistor("R_1", 60.0, 0.0));
        sch.add_component(port("PORT_1", 1, 0.0, 0.0));
        let b = build_netlist(&sch).unwrap();

        // Compare partitions: same terminals together, same ground side.
        let pairs = [
            ("PORT_1", Terminal::Start, "R_1", Terminal::Start),
            ("R_1", Terminal::End, "GND_1", Terminal::Start),
        ];
        for (c1, t1, c2, t2) in pairs {
            assert_eq!(
                a.node(c1, t1) == a.node(c2, t2),
                b.node(c1, t1) == b.node(c2, t2)
            );
        }
        assert_eq!(
            a.node("R_1", Terminal::End) == Some(a.ground),
            b.node("R_1", Terminal::End) == Some(b.ground)
        );
    }

    #[test]
    fn test_hint_mismatch_warning() {
        let mut sch = series_circuit();
        let mut wire = sch.wires.get("wire_1").unwrap().clone();
        wire.start_hint = Some(rfcalc_core::TerminalRef {
            component: "R_1".into(),
            terminal: Terminal::End, // actually on the far side
        });
        sch.add_wire(wire);
        let netlist = build_netlist(&sch).unwrap();
        assert!(netlist
            .diagnostics
            .warnings()
            .any(|i| i.category == "hints"));
    }
}
