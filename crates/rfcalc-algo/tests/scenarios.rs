//! End-to-end engine scenarios.
//!
//! Covers:
//! - Series resistor two-port (the classic 1/3–2/3 split)
//! - Ideal through and full isolation
//! - Shorted stubs, lossless and lossy, against closed-form impedances
//! - Matching-range traversal: closure, vertex agreement, restoration
//! - Reciprocity and passivity of passive networks

use num_complex::Complex64;
use rfcalc_algo::{
    matching_range, scattering_at, sweep, MatchingConfig, SweepConfig, TuneRange,
};
use rfcalc_core::{
    db20, Component, ComponentKind, Hertz, PortParams, Schematic, TlineParams, Wire,
};
use std::f64::consts::{LN_10, TAU};
use std::sync::atomic::AtomicBool;

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

/// Port 1 ── R ── Port 2 with a grounded reference net off to the side.
fn series_r_two_port(resistance: f64) -> Schematic {
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(port("PORT_2", 2, 200.0, 0.0));
    sch.add_component(Component::new(
        "R_1",
        ComponentKind::Resistor { resistance },
        100.0,
        0.0,
    ));
    sch.add_component(gnd("GND_1", 100.0, 100.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 80.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 120.0, 0.0, 200.0, 0.0));
    sch.add_wire(Wire::new("wire_3", 100.0, 100.0, 100.0, 60.0));
    sch
}

#[test]
fn series_fifty_ohm_splits_one_third_two_thirds() {
    let sch = series_r_two_port(50.0);
    for f in [1.0e6, 100.0e6, 2.4e9] {
        let analysis = scattering_at(&sch, f, None).unwrap();
        let third = Complex64::new(1.0 / 3.0, 0.0);
        let two_thirds = Complex64::new(2.0 / 3.0, 0.0);
        assert!((analysis.s_param(0, 0) - third).norm() < 1e-5);
        assert!((analysis.s_param(1, 1) - third).norm() < 1e-5);
        assert!((analysis.s_param(0, 1) - two_thirds).norm() < 1e-5);
        assert!((analysis.s_param(1, 0) - two_thirds).norm() < 1e-5);
        // |S11| ≈ −9.542 dB, zero phase
        assert!((db20(analysis.s_param(0, 0)) + 9.5424).abs() < 1e-3);
        assert!(analysis.s_param(0, 0).im.abs() < 1e-6);
    }
}

#[test]
fn ideal_through_is_transparent() {
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(port("PORT_2", 2, 100.0, 0.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 100.0, 0.0));
    // Reference net, connected but separate
    sch.add_component(gnd("GND_1", 300.0, 300.0));
    sch.add_wire(Wire::new("wire_2", 300.0, 300.0, 340.0, 300.0));

    // The GMIN-regularized common mode leaves ~2e-6 of roundoff here
    let analysis = scattering_at(&sch, 500.0e6, None).unwrap();
    assert!(analysis.s_param(0, 0).norm() < 1e-5);
    assert!(analysis.s_param(1, 1).norm() < 1e-5);
    assert!((analysis.s_param(1, 0) - Complex64::new(1.0, 0.0)).norm() < 1e-5);
    assert!((analysis.s_param(0, 1) - Complex64::new(1.0, 0.0)).norm() < 1e-5);
}

#[test]
fn isolated_ports_read_open() {
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(port("PORT_2", 2, 200.0, 0.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 200.0, 0.0, 240.0, 0.0));
    sch.add_component(gnd("GND_1", 100.0, 100.0));
    sch.add_wire(Wire::new("wire_3", 100.0, 100.0, 140.0, 100.0));

    let analysis = scattering_at(&sch, 100.0e6, None).unwrap();
    assert!((analysis.s_param(0, 0) - Complex64::new(1.0, 0.0)).norm() < 1e-6);
    assert!((analysis.s_param(1, 1) - Complex64::new(1.0, 0.0)).norm() < 1e-6);
    assert!(analysis.s_param(1, 0).norm() < 1e-6);
}

/// Port 1 feeding a stub shorted at its far end.
fn shorted_stub(tl: TlineParams) -> Schematic {
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(Component::new(
        "TL_1",
        ComponentKind::TransmissionLine(tl),
        100.0,
        0.0,
    ));
    sch.add_component(gnd("GND_1", 160.0, 0.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 80.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 120.0, 0.0, 160.0, 0.0));
    sch
}

#[test]
fn quarter_wave_shorted_stub_reads_open() {
    let tl = TlineParams {
        z0: 50.0,
        z0_imag: 0.0,
        length: 0.1,
        velocity: 3.0e8,
        loss_db: 0.0,
    };
    // βl = π/2 at 750 MHz: the short transforms to an open
    let analysis = scattering_at(&shorted_stub(tl), 750.0e6, None).unwrap();
    let s11 = analysis.s_param(0, 0);
    assert!(db20(s11).abs() < 1e-6);
    assert!(rfcalc_core::phase_deg(s11).value().abs() < 1e-3);
}

#[test]
fn eighth_wave_shorted_stub_reads_j_z0() {
    let tl = TlineParams {
        z0: 50.0,
        z0_imag: 0.0,
        length: 0.1,
        velocity: 3.0e8,
        loss_db: 0.0,
    };
    // βl = π/4 at 375 MHz: Zin = j·Z0·tan(π/4) = j50
    let sch = shorted_stub(tl);
    let zin = rfcalc_algo::input_impedance_at(&sch, 375.0e6).unwrap();
    assert!((zin - Complex64::new(0.0, 50.0)).norm() < 1e-3);
}

#[test]
fn parallel_lossy_stubs_match_tanh_form() {
    // Two shorted stubs with complex characteristic impedances hanging
    // off the same node.
    let tl1 = TlineParams {
        z0: 50.0,
        z0_imag: 50.0,
        length: 0.1,
        velocity: 3.0e8,
        loss_db: 0.0,
    };
    let tl2 = TlineParams {
        z0: 50.0,
        z0_imag: -20.0,
        length: 0.1,
        velocity: 3.0e8,
        loss_db: 0.0,
    };

    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(Component::new(
        "TL_1",
        ComponentKind::TransmissionLine(tl1),
        100.0,
        0.0,
    ));
    sch.add_component(Component::new(
        "TL_2",
        ComponentKind::TransmissionLine(tl2),
        100.0,
        80.0,
    ));
    sch.add_component(gnd("GND_1", 160.0, 40.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 80.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 80.0, 0.0, 80.0, 80.0));
    sch.add_wire(Wire::new("wire_3", 120.0, 0.0, 160.0, 0.0));
    sch.add_wire(Wire::new("wire_4", 160.0, 0.0, 160.0, 80.0));
    sch.add_wire(Wire::new("wire_5", 160.0, 80.0, 120.0, 80.0));

    let config = SweepConfig {
        start: Hertz(100.0e6),
        stop: Hertz(1000.0e6),
        points: 10,
        ..SweepConfig::default()
    };
    let result = sweep(&sch, &config, |_| {}, &AtomicBool::new(false)).unwrap();

    for k in 0..result.points() {
        let f = result.frequencies[k].value();
        let zin = |tl: &TlineParams| -> Complex64 {
            let zc = Complex64::new(tl.z0, tl.z0_imag);
            let gamma_l = Complex64::new(
                tl.loss_db * LN_10 / 20.0 * tl.length,
                TAU * f * tl.length / tl.velocity,
            );
            zc * gamma_l.tanh()
        };
        let z1 = zin(&tl1);
        let z2 = zin(&tl2);
        let z = z1 * z2 / (z1 + z2);
        let expected_s11 = (z - 50.0) / (z + 50.0);
        let expected_db = db20(expected_s11);
        assert!(
            (result.trace(0, 0).db[k] - expected_db).abs() < 1e-6,
            "mismatch at {f} Hz"
        );
    }
}

#[test]
fn two_element_matching_range_traverses_the_rectangle() {
    // Port 1 ── R ── C ── ground, tuning both elements.
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(Component::new(
        "R_1",
        ComponentKind::Resistor { resistance: 50.0 },
        60.0,
        0.0,
    ));
    sch.add_component(Component::new(
        "C_1",
        ComponentKind::Capacitor { capacitance: 5e-12 },
        140.0,
        0.0,
    ));
    sch.add_component(gnd("GND_1", 200.0, 0.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 40.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 80.0, 0.0, 120.0, 0.0));
    sch.add_wire(Wire::new("wire_3", 160.0, 0.0, 200.0, 0.0));

    let before = sch.clone();
    let selection = [
        TuneRange {
            component: "R_1".into(),
            min: 10.0,
            max: 200.0,
        },
        TuneRange {
            component: "C_1".into(),
            min: 1e-12,
            max: 10e-12,
        },
    ];
    let steps = 8;
    let config = MatchingConfig {
        frequency: Hertz(100.0e6),
        steps_per_edge: steps,
        invert_reactance: false,
        z0: None,
    };
    let mut last_progress = 0.0;
    let path = matching_range(
        &sch,
        &selection,
        &config,
        |p| {
            assert!(p >= last_progress && p <= 1.0);
            last_progress = p;
        },
        &AtomicBool::new(false),
    )
    .unwrap();

    // Closed rectangle traversal: 4 edges of `steps` points plus the seed
    assert_eq!(path.points.len(), 4 * steps + 1);
    assert_eq!(path.points.first(), path.points.last());
    assert_eq!(path.kind, rfcalc_algo::PathKind::Rectangle);

    // Vertices land every `steps` points, in Gray order:
    // (min,min) (max,min) (max,max) (min,max)
    let vertex_values = [
        (10.0, 1e-12),
        (200.0, 1e-12),
        (200.0, 10e-12),
        (10.0, 10e-12),
    ];
    for (v, &(r, c)) in vertex_values.iter().enumerate() {
        let mut tuned = sch.clone();
        for (id, value) in [("R_1", r), ("C_1", c)] {
            let comp = tuned.components.get_mut(id).unwrap();
            comp.kind = comp.kind.with_primary_value(value);
        }
        let direct = scattering_at(&tuned, 100.0e6, None).unwrap().s_param(0, 0);
        let traversed = path.points[v * steps];
        assert!(
            (direct - traversed).norm() < 1e-12,
            "vertex {v} disagrees with direct evaluation"
        );
    }

    // Restoration: the schematic is exactly as supplied
    assert_eq!(sch.components, before.components);
    assert_eq!(
        sch.components.get("R_1").unwrap().kind.primary_value(),
        Some(50.0)
    );
}

#[test]
fn matching_range_honours_cancellation() {
    let sch = series_r_two_port(50.0);
    let selection = [TuneRange {
        component: "R_1".into(),
        min: 10.0,
        max: 100.0,
    }];
    let cancel = AtomicBool::new(true);
    let err = matching_range(
        &sch,
        &selection,
        &MatchingConfig::default(),
        |_| {},
        &cancel,
    )
    .unwrap_err();
    assert!(matches!(err, rfcalc_core::RfError::Cancelled));
}

#[test]
fn matching_range_rejects_bad_input() {
    let sch = series_r_two_port(50.0);
    let config = MatchingConfig::default();
    let cancel = AtomicBool::new(false);

    // Empty selection
    assert!(matching_range(&sch, &[], &config, |_| {}, &cancel).is_err());

    // Unknown component
    let unknown = [TuneRange {
        component: "R_99".into(),
        min: 1.0,
        max: 2.0,
    }];
    assert!(matching_range(&sch, &unknown, &config, |_| {}, &cancel).is_err());

    // Inverted range
    let inverted = [TuneRange {
        component: "R_1".into(),
        min: 10.0,
        max: 1.0,
    }];
    assert!(matching_range(&sch, &inverted, &config, |_| {}, &cancel).is_err());

    // Zero steps
    let selection = [TuneRange {
        component: "R_1".into(),
        min: 1.0,
        max: 2.0,
    }];
    let bad_config = MatchingConfig {
        steps_per_edge: 0,
        ..MatchingConfig::default()
    };
    assert!(matching_range(&sch, &selection, &bad_config, |_| {}, &cancel).is_err());
}

#[test]
fn integrated_block_behaves_as_shunt_one_port() {
    // INT_1 wraps a lone 100 Ω resistor (driven at start, grounded at
    // end); hanging it off the port node must read like a 100 Ω shunt.
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(Component::new(
        "R_1",
        ComponentKind::Resistor { resistance: 100.0 },
        500.0,
        500.0,
    ));
    sch.add_component(Component::new(
        "INT_1",
        ComponentKind::Integrated(rfcalc_core::SubBlock {
            components: vec!["R_1".into()],
            wires: Vec::new(),
            input: rfcalc_core::TerminalRef {
                component: "R_1".into(),
                terminal: rfcalc_core::Terminal::Start,
            },
            ground: rfcalc_core::TerminalRef {
                component: "R_1".into(),
                terminal: rfcalc_core::Terminal::End,
            },
        }),
        100.0,
        0.0,
    ));
    sch.add_component(gnd("GND_1", 200.0, 200.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 100.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 200.0, 200.0, 240.0, 200.0));

    let netlist = rfcalc_algo::build_netlist(&sch).unwrap();
    // The block's member resistor is interior: its terminals get no nodes
    assert_eq!(netlist.terminal_count(), 3);

    let analysis = scattering_at(&sch, 100.0e6, None).unwrap();
    // 100 Ω to ground against 50 Ω: S11 = 1/3
    assert!((analysis.s_param(0, 0) - Complex64::new(1.0 / 3.0, 0.0)).norm() < 1e-5);
}

#[test]
fn passive_networks_are_reciprocal_and_passive() {
    // R-L-C-TL ladder between two ports
    let mut sch = Schematic::new();
    sch.add_component(port("PORT_1", 1, 0.0, 0.0));
    sch.add_component(port("PORT_2", 2, 400.0, 0.0));
    sch.add_component(Component::new(
        "L_1",
        ComponentKind::Inductor { inductance: 22e-9 },
        100.0,
        0.0,
    ));
    sch.add_component(Component::new(
        "C_1",
        ComponentKind::Capacitor { capacitance: 3e-12 },
        200.0,
        80.0,
    ));
    sch.add_component(Component::new(
        "TL_1",
        ComponentKind::TransmissionLine(TlineParams {
            z0: 75.0,
            z0_imag: 0.0,
            length: 0.05,
            velocity: 2.0e8,
            loss_db: 0.0,
        }),
        300.0,
        0.0,
    ));
    sch.add_component(gnd("GND_1", 200.0, 160.0));
    sch.add_wire(Wire::new("wire_1", 0.0, 0.0, 80.0, 0.0));
    sch.add_wire(Wire::new("wire_2", 120.0, 0.0, 280.0, 0.0));
    sch.add_wire(Wire::new("wire_3", 180.0, 0.0, 180.0, 80.0));
    sch.add_wire(Wire::new("wire_4", 220.0, 80.0, 220.0, 160.0));
    sch.add_wire(Wire::new("wire_5", 220.0, 160.0, 200.0, 160.0));
    sch.add_wire(Wire::new("wire_6", 320.0, 0.0, 400.0, 0.0));

    let config = SweepConfig {
        start: Hertz(10.0e6),
        stop: Hertz(2.0e9),
        points: 25,
        ..SweepConfig::default()
    };
    let result = sweep(&sch, &config, |_| {}, &AtomicBool::new(false)).unwrap();

    for k in 0..result.points() {
        let s12 = result.trace(0, 1).s[k];
        let s21 = result.trace(1, 0).s[k];
        assert!((s12 - s21).norm() < 1e-9, "reciprocity at point {k}");
        for i in 0..2 {
            for j in 0..2 {
                assert!(
                    result.trace(i, j).s[k].norm() <= 1.0 + 1e-9,
                    "passivity of S{}{} at point {k}",
                    i + 1,
                    j + 1
                );
            }
        }
    }
}
