//! Isolated simulation of a component or sub-assembly.
//!
//! To read the impedance of a selection outside its surrounding circuit,
//! a throwaway schematic is synthesized: the selection is deep-cloned
//! with fresh ids, a port is placed three grid cells to the left of the
//! chosen input terminal and a ground three cells to the right of the
//! chosen ground terminal, and both are wired terminal-to-terminal. The
//! temporary circuit then runs through the normal netlist → admittance →
//! S-parameter chain and the impedance falls out of S11.
//!
//! Integrated blocks skip the synthesis entirely: they already carry
//! their own input/ground configuration, so their impedance routine is
//! called directly.

use crate::admittance;
use crate::netlist;
use crate::overlay::ParamOverlay;
use crate::sparams;
use num_complex::Complex64;
use rfcalc_core::{
    gamma_to_z, Component, ComponentKind, PortParams, RfError, RfResult, Schematic, SubBlock,
    TerminalRef, Wire, DEFAULT_Z0, GRID,
};
use std::collections::HashMap;

/// Distance from the attachment terminals to the synthetic port and
/// ground, in canvas units.
const ATTACH_OFFSET: f64 = 3.0 * GRID;

/// What to lift out of the schematic and where to drive it.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolatedTarget {
    pub components: Vec<String>,
    pub wires: Vec<String>,
    /// Terminal the synthetic port attaches to
    pub input: TerminalRef,
    /// Terminal the synthetic ground attaches to
    pub ground: TerminalRef,
}

impl IsolatedTarget {
    /// Target a single two-terminal component, honouring its isolation
    /// config when present (input on `start`, ground on `end` otherwise).
    pub fn single(component: &Component) -> RfResult<Self> {
        // Integrated blocks already know their attachment points; the
        // simulation fast path will skip synthesis for them entirely.
        if let ComponentKind::Integrated(block) = &component.kind {
            return Ok(Self {
                components: vec![component.id.clone()],
                wires: Vec::new(),
                input: block.input.clone(),
                ground: block.ground.clone(),
            });
        }
        let terminals = component.kind.terminals();
        if terminals.len() < 2 {
            return Err(RfError::InvalidInput(format!(
                "{} has no terminal pair to drive",
                component.id
            )));
        }
        let iso = component.iso.unwrap_or_default();
        Ok(Self {
            components: vec![component.id.clone()],
            wires: Vec::new(),
            input: TerminalRef {
                component: component.id.clone(),
                terminal: iso.input,
            },
            ground: TerminalRef {
                component: component.id.clone(),
                terminal: iso.ground,
            },
        })
    }

    /// Target the contents of an integrated block.
    pub fn from_block(block: &SubBlock) -> Self {
        Self {
            components: block.components.clone(),
            wires: block.wires.clone(),
            input: block.input.clone(),
            ground: block.ground.clone(),
        }
    }
}

/// Build the synthetic one-port schematic for a target.
fn synthesize(
    schematic: &Schematic,
    target: &IsolatedTarget,
    overlay: &ParamOverlay,
) -> RfResult<Schematic> {
    let mut temp = Schematic::new();
    let mut id_map: HashMap<String, String> = HashMap::new();

    for old_id in &target.components {
        let source = schematic.components.get(old_id).ok_or_else(|| {
            RfError::InvalidInput(format!("unknown component {old_id} in selection"))
        })?;
        // Bake any tuned value into the clone; the temporary circuit has
        // its own id space, so overlays cannot follow it.
        let kind = overlay.kind_of(source);
        let fresh = temp.next_component_id(kind.tag());
        let mut clone = Component::new(fresh.clone(), kind, source.position.x, source.position.y);
        clone.rotation = source.rotation;
        clone.iso = source.iso;
        id_map.insert(old_id.clone(), fresh);
        temp.add_component(clone);
    }

    // Integrated members reference other components by id; remap them
    // into the cloned id space.
    let clone_ids: Vec<String> = temp.components.keys().cloned().collect();
    for id in clone_ids {
        if let Some(mut component) = temp.components.get(&id).cloned() {
            if let ComponentKind::Integrated(block) = &mut component.kind {
                remap_block(block, &id_map)?;
                temp.add_component(component);
            }
        }
    }

    for old_id in &target.wires {
        let source = schematic
            .wires
            .get(old_id)
            .ok_or_else(|| RfError::InvalidInput(format!("unknown wire {old_id} in selection")))?;
        let fresh = temp.next_wire_id();
        temp.add_wire(Wire::new(
            fresh,
            source.start.x,
            source.start.y,
            source.end.x,
            source.end.y,
        ));
    }

    let input_id = id_map
        .get(&target.input.component)
        .ok_or_else(|| RfError::InvalidInput("input terminal outside selection".into()))?;
    let ground_id = id_map
        .get(&target.ground.component)
        .ok_or_else(|| RfError::InvalidInput("ground terminal outside selection".into()))?;
    let input_pos = temp
        .terminal_position(input_id, target.input.terminal)
        .ok_or_else(|| RfError::InvalidInput("input terminal does not exist".into()))?;
    let ground_pos = temp
        .terminal_position(ground_id, target.ground.terminal)
        .ok_or_else(|| RfError::InvalidInput("ground terminal does not exist".into()))?;

    let port_id = temp.next_component_id("PORT");
    temp.add_component(Component::new(
        port_id,
        ComponentKind::Port(PortParams {
            number: 1,
            impedance: DEFAULT_Z0,
        }),
        input_pos.x - ATTACH_OFFSET,
        input_pos.y,
    ));
    let wire_id = temp.next_wire_id();
    temp.add_wire(Wire::new(
        wire_id,
        input_pos.x - ATTACH_OFFSET,
        input_pos.y,
        input_pos.x,
        input_pos.y,
    ));

    let gnd_id = temp.next_component_id("GND");
    temp.add_component(Component::new(
        gnd_id,
        ComponentKind::Ground,
        ground_pos.x + ATTACH_OFFSET,
        ground_pos.y,
    ));
    let wire_id = temp.next_wire_id();
    temp.add_wire(Wire::new(
        wire_id,
        ground_pos.x,
        ground_pos.y,
        ground_pos.x + ATTACH_OFFSET,
        ground_pos.y,
    ));

    Ok(temp)
}

fn remap_block(block: &mut SubBlock, id_map: &HashMap<String, String>) -> RfResult<()> {
    for member in block.components.iter_mut() {
        *member = id_map
            .get(member)
            .ok_or_else(|| {
                RfError::InvalidInput(format!("integrated member {member} outside selection"))
            })?
            .clone();
    }
    // Member wires are resolved geometrically in the clone, so stale ids
    // are simply dropped from the block listing.
    block.wires.clear();
    for attach in [&mut block.input, &mut block.ground] {
        if let Some(fresh) = id_map.get(&attach.component) {
            attach.component = fresh.clone();
        }
    }
    Ok(())
}

/// Impedance of the target at each frequency, from `Z = Z0·(1+S11)/(1−S11)`.
pub fn simulate_isolated(
    schematic: &Schematic,
    target: &IsolatedTarget,
    frequencies: &[f64],
) -> RfResult<Vec<Complex64>> {
    // Fast path: a lone integrated block brings its own configuration.
    if target.components.len() == 1 && target.wires.is_empty() {
        if let Some(component) = schematic.components.get(&target.components[0]) {
            if let ComponentKind::Integrated(block) = &component.kind {
                let overlay = ParamOverlay::new();
                return frequencies
                    .iter()
                    .map(|&f| integrated_impedance(schematic, block, &overlay, f))
                    .collect();
            }
        }
    }

    let temp = synthesize(schematic, target, &ParamOverlay::new())?;
    let nl = netlist::build_netlist(&temp)?;
    let z0 = Complex64::new(DEFAULT_Z0, 0.0);
    let mut out = Vec::with_capacity(frequencies.len());
    for &f in frequencies {
        let ysys = admittance::build_admittance(&temp, &nl, &ParamOverlay::new(), f)?;
        let analysis = sparams::port_analysis(&ysys, &nl, DEFAULT_Z0);
        out.push(gamma_to_z(analysis.s_param(0, 0), z0));
    }
    Ok(out)
}

/// One-port impedance of an integrated block at a single frequency.
///
/// Members must live in `schematic`; tuned member values in `overlay`
/// are baked into the synthesized clone.
pub fn integrated_impedance(
    schematic: &Schematic,
    block: &SubBlock,
    overlay: &ParamOverlay,
    f: f64,
) -> RfResult<Complex64> {
    let target = IsolatedTarget::from_block(block);
    let temp = synthesize(schematic, &target, overlay)?;
    let nl = netlist::build_netlist(&temp)?;
    let ysys = admittance::build_admittance(&temp, &nl, &ParamOverlay::new(), f)?;
    let analysis = sparams::port_analysis(&ysys, &nl, DEFAULT_Z0);
    Ok(gamma_to_z(
        analysis.s_param(0, 0),
        Complex64::new(DEFAULT_Z0, 0.0),
    ))
}
