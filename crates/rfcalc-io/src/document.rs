//! Persisted circuit document (JSON).
//!
//! The on-disk schema keeps the editor's conventions: flat component
//! records with a `type` tag and a `params` object, camelCase keys, wires
//! with endpoint coordinates and advisory connection hints. Per-component
//! `connections` caches are accepted on input and ignored — spatial
//! netlisting is the source of truth for connectivity.

use rfcalc_core::{
    Component, ComponentKind, IsoConfig, ParamRange, PortParams, RfError, RfResult, Rotation,
    Schematic, SubBlock, Terminal, TerminalRef, TlineParams, Wire,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Current document format version.
pub const DOCUMENT_VERSION: &str = "1.0";

/// Top-level document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitDocument {
    pub version: String,
    pub components: Vec<ComponentDoc>,
    pub wires: Vec<WireDoc>,
}

/// One placed component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDoc {
    pub id: String,
    #[serde(flatten)]
    pub kind: KindDoc,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Rotation in degrees, quarter turns only
    #[serde(default)]
    pub rotation: i64,
    /// Editor cache of terminal → wire id; advisory, ignored on import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_range: Option<BTreeMap<String, RangeDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_config: Option<IsoDoc>,
}

/// Tagged parameter record: `"type"` selects the kind, `"params"`
/// carries its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum KindDoc {
    R(ResistorDoc),
    L(InductorDoc),
    C(CapacitorDoc),
    #[serde(rename = "GND")]
    Gnd(GroundDoc),
    #[serde(rename = "PORT")]
    Port(PortDoc),
    #[serde(rename = "TL")]
    Tline(TlineDoc),
    #[serde(rename = "INT")]
    Integrated(IntegratedDoc),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResistorDoc {
    pub resistance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InductorDoc {
    pub inductance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacitorDoc {
    pub capacitance: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundDoc {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDoc {
    pub port_number: u8,
    pub impedance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TlineDoc {
    pub z0: f64,
    pub length: f64,
    pub velocity: f64,
    #[serde(default)]
    pub loss: f64,
    #[serde(default)]
    pub z0_imag: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegratedDoc {
    pub components: Vec<String>,
    #[serde(default)]
    pub wires: Vec<String>,
    pub input: TerminalRefDoc,
    pub ground: TerminalRefDoc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalRefDoc {
    pub component: String,
    pub terminal: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RangeDoc {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsoDoc {
    pub input: String,
    pub ground: String,
}

/// One wire segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDoc {
    pub id: String,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_terminal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_terminal: Option<String>,
}

fn parse_terminal(name: &str, context: &str) -> RfResult<Terminal> {
    Terminal::parse(name)
        .ok_or_else(|| RfError::Parse(format!("unknown terminal '{name}' on {context}")))
}

fn parse_terminal_ref(doc: &TerminalRefDoc) -> RfResult<TerminalRef> {
    Ok(TerminalRef {
        component: doc.component.clone(),
        terminal: parse_terminal(&doc.terminal, &doc.component)?,
    })
}

impl CircuitDocument {
    /// Convert a document into the in-memory schematic.
    pub fn to_schematic(&self) -> RfResult<Schematic> {
        let mut schematic = Schematic::new();

        for doc in &self.components {
            let kind = match &doc.kind {
                KindDoc::R(p) => ComponentKind::Resistor {
                    resistance: p.resistance,
                },
                KindDoc::L(p) => ComponentKind::Inductor {
                    inductance: p.inductance,
                },
                KindDoc::C(p) => ComponentKind::Capacitor {
                    capacitance: p.capacitance,
                },
                KindDoc::Gnd(_) => ComponentKind::Ground,
                KindDoc::Port(p) => ComponentKind::Port(PortParams {
                    number: p.port_number,
                    impedance: p.impedance,
                }),
                KindDoc::Tline(p) => ComponentKind::TransmissionLine(TlineParams {
                    z0: p.z0,
                    z0_imag: p.z0_imag,
                    length: p.length,
                    velocity: p.velocity,
                    loss_db: p.loss,
                }),
                KindDoc::Integrated(p) => ComponentKind::Integrated(SubBlock {
                    components: p.components.clone(),
                    wires: p.wires.clone(),
                    input: parse_terminal_ref(&p.input)?,
                    ground: parse_terminal_ref(&p.ground)?,
                }),
            };

            let rotation = Rotation::from_degrees(doc.rotation).ok_or_else(|| {
                RfError::Parse(format!(
                    "rotation {} on {} is not a quarter turn",
                    doc.rotation, doc.id
                ))
            })?;

            let mut component = Component::new(doc.id.clone(), kind, doc.x, doc.y);
            component.rotation = rotation;
            if let Some(ranges) = &doc.slider_range {
                for (param, range) in ranges {
                    component
                        .slider_ranges
                        .insert(param.clone(), ParamRange {
                            min: range.min,
                            max: range.max,
                        });
                }
            }
            if let Some(iso) = &doc.iso_config {
                component.iso = Some(IsoConfig {
                    input: parse_terminal(&iso.input, &doc.id)?,
                    ground: parse_terminal(&iso.ground, &doc.id)?,
                });
            }
            schematic.add_component(component);
        }

        for doc in &self.wires {
            let mut wire = Wire::new(doc.id.clone(), doc.start_x, doc.start_y, doc.end_x, doc.end_y);
            if let (Some(component), Some(terminal)) = (&doc.start_component, &doc.start_terminal) {
                wire.start_hint = Some(TerminalRef {
                    component: component.clone(),
                    terminal: parse_terminal(terminal, &doc.id)?,
                });
            }
            if let (Some(component), Some(terminal)) = (&doc.end_component, &doc.end_terminal) {
                wire.end_hint = Some(TerminalRef {
                    component: component.clone(),
                    terminal: parse_terminal(terminal, &doc.id)?,
                });
            }
            schematic.add_wire(wire);
        }

        Ok(schematic)
    }

    /// Build a document from the in-memory schematic.
    pub fn from_schematic(schematic: &Schematic) -> Self {
        let components = schematic
            .components
            .values()
            .map(|component| {
                let kind = match &component.kind {
                    ComponentKind::Resistor { resistance } => KindDoc::R(ResistorDoc {
                        resistance: *resistance,
                    }),
                    ComponentKind::Inductor { inductance } => KindDoc::L(InductorDoc {
                        inductance: *inductance,
                    }),
                    ComponentKind::Capacitor { capacitance } => KindDoc::C(CapacitorDoc {
                        capacitance: *capacitance,
                    }),
                    ComponentKind::Ground => KindDoc::Gnd(GroundDoc::default()),
                    ComponentKind::Port(p) => KindDoc::Port(PortDoc {
                        port_number: p.number,
                        impedance: p.impedance,
                    }),
                    ComponentKind::TransmissionLine(p) => KindDoc::Tline(TlineDoc {
                        z0: p.z0,
                        length: p.length,
                        velocity: p.velocity,
                        loss: p.loss_db,
                        z0_imag: p.z0_imag,
                    }),
                    ComponentKind::Integrated(p) => KindDoc::Integrated(IntegratedDoc {
                        components: p.components.clone(),
                        wires: p.wires.clone(),
                        input: TerminalRefDoc {
                            component: p.input.component.clone(),
                            terminal: p.input.terminal.name().to_string(),
                        },
                        ground: TerminalRefDoc {
                            component: p.ground.component.clone(),
                            terminal: p.ground.terminal.name().to_string(),
                        },
                    }),
                };

                let slider_range = if component.slider_ranges.is_empty() {
                    None
                } else {
                    Some(
                        component
                            .slider_ranges
                            .iter()
                            .map(|(k, r)| (k.clone(), RangeDoc { min: r.min, max: r.max }))
                            .collect(),
                    )
                };

                ComponentDoc {
                    id: component.id.clone(),
                    kind,
                    x: component.position.x,
                    y: component.position.y,
                    rotation: i64::from(component.rotation.degrees()),
                    connections: None,
                    slider_range,
                    iso_config: component.iso.map(|iso| IsoDoc {
                        input: iso.input.name().to_string(),
                        ground: iso.ground.name().to_string(),
                    }),
                }
            })
            .collect();

        let wires = schematic
            .wires
            .values()
            .map(|wire| WireDoc {
                id: wire.id.clone(),
                start_x: wire.start.x,
                start_y: wire.start.y,
                end_x: wire.end.x,
                end_y: wire.end.y,
                start_component: wire.start_hint.as_ref().map(|h| h.component.clone()),
                start_terminal: wire
                    .start_hint
                    .as_ref()
                    .map(|h| h.terminal.name().to_string()),
                end_component: wire.end_hint.as_ref().map(|h| h.component.clone()),
                end_terminal: wire.end_hint.as_ref().map(|h| h.terminal.name().to_string()),
            })
            .collect();

        Self {
            version: DOCUMENT_VERSION.to_string(),
            components,
            wires,
        }
    }
}

/// Parse a schematic from document JSON.
pub fn schematic_from_json(json: &str) -> RfResult<Schematic> {
    let doc: CircuitDocument = serde_json::from_str(json)?;
    doc.to_schematic()
}

/// Serialize a schematic to document JSON (pretty-printed).
pub fn schematic_to_json(schematic: &Schematic) -> RfResult<String> {
    let doc = CircuitDocument::from_schematic(schematic);
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Load a schematic from a document file.
pub fn load_schematic(path: impl AsRef<Path>) -> RfResult<Schematic> {
    let json = fs::read_to_string(path)?;
    schematic_from_json(&json)
}

/// Write a schematic to a document file.
pub fn save_schematic(schematic: &Schematic, path: impl AsRef<Path>) -> RfResult<()> {
    fs::write(path, schematic_to_json(schematic)?)?;
    Ok(())
}
