use ballstick_cell::{
    BallAndStick, CableEngine, CellConfig, EngineCall, InMemoryEngine, MorphologyParams,
    RunState, SimulationContext,
};
use ballstick_core::{CableError, SimulationParams};

const WHOLETREE_SOMA: [&str; 9] = [
    "soma", "apic[0]", "apic[1]", "apic[2]", "dend[0]", "dend[1]", "ais_prox", "ais_dist", "axon",
];

fn names(cell: &ballstick_cell::Cell) -> Vec<&str> {
    cell.iter().map(|s| s.name.as_str()).collect()
}

// =============================================================================
// TOPOLOGY
// =============================================================================

#[test]
fn test_invalid_ais_mode() {
    for mode in ["axon", "", "SOMA", "dendrite"] {
        let config = CellConfig::default().with_ais_mode(mode);
        let result = BallAndStick::build(1, &config);
        assert!(
            matches!(result, Err(CableError::InvalidConfig(_))),
            "mode {:?} should be rejected",
            mode
        );
    }
}

#[test]
fn test_ais_on_soma() {
    let cell = BallAndStick::new(0).unwrap();
    assert_eq!(cell.parent_of("ais_prox"), Some(("soma", 1.0)));
    assert_eq!(cell.parent_of("ais_dist"), Some(("ais_prox", 1.0)));
    assert_eq!(cell.parent_of("axon"), Some(("ais_dist", 1.0)));
}

#[test]
fn test_ais_on_dend() {
    let config = CellConfig::default()
        .with_ais_mode("dend")
        .with_acd_connect_x(0.35);
    let cell = BallAndStick::build(0, &config).unwrap();
    assert_eq!(cell.parent_of("ais_prox"), Some(("dend[0]", 0.35)));
    assert!(cell.soma().children.iter().all(|&c| c != cell.sections().ais_prox));

    // Default attachment point
    let cell = BallAndStick::build(0, &CellConfig::default().with_ais_mode("dend")).unwrap();
    assert_eq!(cell.parent_of("ais_prox"), Some(("dend[0]", 0.1)));
}

#[test]
fn test_acd_connect_x_ignored_on_soma() {
    let config = CellConfig::default().with_acd_connect_x(0.8);
    let cell = BallAndStick::build(0, &config).unwrap();
    assert_eq!(cell.parent_of("ais_prox"), Some(("soma", 1.0)));
}

#[test]
fn test_fixed_connections() {
    let cell = BallAndStick::new(0).unwrap();
    assert_eq!(cell.parent_of("soma"), None);
    assert_eq!(cell.parent_of("apic[0]"), Some(("soma", 0.5)));
    assert_eq!(cell.parent_of("apic[1]"), Some(("apic[0]", 1.0)));
    assert_eq!(cell.parent_of("apic[2]"), Some(("apic[0]", 1.0)));
    assert_eq!(cell.parent_of("dend[0]"), Some(("soma", 1.0)));
    assert_eq!(cell.parent_of("dend[1]"), Some(("soma", 1.0)));
    cell.morphology().validate().unwrap();
}

#[test]
fn test_wholetree_has_nine_sections() {
    let cell = BallAndStick::new(0).unwrap();
    assert_eq!(names(&cell), WHOLETREE_SOMA);

    let cell = BallAndStick::build(0, &CellConfig::default().with_ais_mode("dend")).unwrap();
    assert_eq!(
        names(&cell),
        vec![
            "soma", "apic[0]", "apic[1]", "apic[2]", "dend[0]", "ais_prox", "ais_dist", "axon",
            "dend[1]"
        ]
    );
}

// =============================================================================
// GEOMETRY AND DISCRETIZATION
// =============================================================================

#[test]
fn test_geometry() {
    let cell = BallAndStick::new(0).unwrap();
    assert!((cell.soma().length() - 20.0).abs() < 1e-12);
    assert_eq!(cell.soma().diam_at(0.5), 20.0);
    assert!((cell.apic(0).unwrap().length() - 400.0).abs() < 1e-12);
    assert!((cell.apic(0).unwrap().diam_at(0.0) - 2.5).abs() < 1e-12);
    assert!((cell.apic(0).unwrap().diam_at(1.0) - 0.5).abs() < 1e-12);
    assert_eq!(cell.apic(1).unwrap().length(), 150.0);
    assert_eq!(cell.apic(2).unwrap().diam_at(0.5), 2.0);
    assert!((cell.dend(0).unwrap().length() - 200.0).abs() < 1e-12);
    assert_eq!(cell.dend(1).unwrap().diam_at(0.5), 1.8);
    assert_eq!(cell.ais_prox().length(), 30.0);
    assert_eq!(cell.ais_dist().length(), 30.0);
    assert_eq!(cell.ais_dist().diam_at(0.5), 1.5);
    assert_eq!(cell.axon().length(), 500.0);
    assert_eq!(cell.axon().diam_at(0.5), 1.0);
}

#[test]
fn test_ais_length_split() {
    let cell = BallAndStick::build(0, &CellConfig::default().with_ais_length(45.0)).unwrap();
    assert_eq!(cell.ais_prox().length(), 22.5);
    assert_eq!(cell.ais_dist().length(), 22.5);
    assert_eq!(cell.ais_prox().nseg(), 21);
}

#[test]
fn test_segment_counts() {
    let cell = BallAndStick::new(0).unwrap();
    let expected = [
        ("soma", 5),
        ("apic[0]", 21),
        ("apic[1]", 5),
        ("apic[2]", 5),
        ("dend[0]", 201),
        ("dend[1]", 11),
        ("ais_prox", 21),
        ("ais_dist", 21),
        ("axon", 25),
    ];
    for (name, nseg) in expected {
        assert_eq!(cell.section(name).unwrap().nseg(), nseg, "{}", name);
    }
}

#[test]
fn test_num_segments() {
    let cell = BallAndStick::new(0).unwrap();
    let sum: usize = cell.iter().map(|s| s.nseg()).sum();
    assert_eq!(cell.num_segments(), sum);
    assert_eq!(cell.num_segments(), 315);
}

#[test]
fn test_dend1_discretized_from_dend0_length() {
    let config = CellConfig {
        morphology: MorphologyParams {
            dend0_length: 100.0,
            dend1_length: 300.0,
            ..Default::default()
        },
        ..Default::default()
    };
    let cell = BallAndStick::build(0, &config).unwrap();
    let dend0 = cell.dend(0).unwrap();
    let dend1 = cell.dend(1).unwrap();

    assert!((dend1.length() - 300.0).abs() < 1e-12);
    assert_eq!(dend0.nseg(), 1 + 2 * 50);
    // 1 + 2 * floor(100 / 40), not 1 + 2 * floor(300 / 40)
    assert_eq!(dend1.nseg(), 5);
    assert_eq!(cell.recordings().dend1_vs.len(), 5);
}

// =============================================================================
// BIOPHYSICS
// =============================================================================

#[test]
fn test_graded_densities() {
    let cell = BallAndStick::new(0).unwrap();
    for name in ["apic[0]", "dend[0]", "dend[1]"] {
        let sec = cell.section(name).unwrap();
        let xs = sec.segment_positions();
        for param in ["gbar_na", "gbar_kv"] {
            let values = sec.param(param).unwrap();
            assert_eq!(values.len(), sec.nseg());
            for (x, v) in xs.iter().zip(values.iter()) {
                assert!((v - (100.0 - 80.0 * x)).abs() < 1e-9, "{} {} at {}", name, param, x);
            }
        }
    }

    // Middle segment of an odd discretization sits at x = 0.5
    let dend1 = cell.dend(1).unwrap();
    assert!((dend1.param_at("gbar_na", 0.5).unwrap() - 60.0).abs() < 1e-9);
    // Proximal segments carry the higher density
    let apic = cell.apic(0).unwrap().param("gbar_kv").unwrap();
    assert!(apic[0] > apic[apic.len() - 1]);
}

#[test]
fn test_gradient_ignores_other_sections() {
    let cell = BallAndStick::new(0).unwrap();
    let tuft = cell.apic(1).unwrap().param("gbar_na").unwrap();
    assert!(tuft.iter().all(|&g| g == 20.0));
}

// =============================================================================
// ENGINE BINDING
// =============================================================================

#[test]
fn test_instantiate_sections() {
    let cell = BallAndStick::new(0).unwrap();
    let mut engine = InMemoryEngine::new();
    cell.instantiate(&mut engine).unwrap();

    assert_eq!(
        engine.section_names(),
        vec!["soma", "apic[0]", "apic[1]", "apic[2]", "dend[0]", "dend[1]", "ais_prox", "ais_dist", "axon"]
    );
    assert_eq!(engine.parent_of("ais_prox"), Some(("soma", 1.0)));
    assert_eq!(engine.parent_of("apic[2]"), Some(("apic[0]", 1.0)));
    assert_eq!(engine.nseg("dend[0]"), Some(201));
    assert_eq!(engine.length("soma"), Some(20.0));
    assert_eq!(engine.length("axon"), Some(500.0));
    let expected: Vec<String> = cell.axon().mechanisms.iter().map(|m| m.name.clone()).collect();
    assert_eq!(expected, ["extracellular", "pas", "na", "kv"]);
    assert_eq!(engine.mechanisms("axon").unwrap(), expected.as_slice());
}

#[test]
fn test_instantiate_parameters() {
    let cell = BallAndStick::build(0, &CellConfig::default().with_ais_mode("dend")).unwrap();
    let mut engine = InMemoryEngine::new();
    cell.instantiate(&mut engine).unwrap();

    assert_eq!(engine.parent_of("ais_prox"), Some(("dend[0]", 0.1)));
    assert_eq!(engine.param("soma", "Ra", 0.5), Some(100.0));
    assert_eq!(engine.param("soma", "gbar_na", 0.5), Some(400.0));
    assert_eq!(engine.param("ais_dist", "gbar_kv", 0.5), Some(2000.0));
    assert_eq!(engine.param("axon", "ek", 0.2), Some(-80.0));

    let x = 10.5 / 21.0;
    assert!((engine.param("apic[0]", "gbar_na", x).unwrap() - 60.0).abs() < 1e-9);
    let x0 = 0.5 / 201.0;
    assert!((engine.param("dend[0]", "gbar_kv", x0).unwrap() - (100.0 - 80.0 * x0)).abs() < 1e-9);

    // Uniform values go through as one section-wide assignment
    let soma_na_calls = engine
        .calls()
        .iter()
        .filter(|c| matches!(c, EngineCall::SetSectionParam { section, name, .. } if section == "soma" && name == "gbar_na"))
        .count();
    assert_eq!(soma_na_calls, 1);
    let graded_calls = engine
        .calls()
        .iter()
        .filter(|c| matches!(c, EngineCall::SetSegmentParam { section, name, .. } if section == "dend[1]" && name == "gbar_na"))
        .count();
    assert_eq!(graded_calls, 11);
}

#[test]
fn test_instantiate_order() {
    let cell = BallAndStick::new(0).unwrap();
    let mut engine = InMemoryEngine::new();
    cell.instantiate(&mut engine).unwrap();
    let calls = engine.calls();

    let last_create = calls
        .iter()
        .rposition(|c| matches!(c, EngineCall::CreateSection(_)))
        .unwrap();
    let first_connect = calls
        .iter()
        .position(|c| matches!(c, EngineCall::Connect { .. }))
        .unwrap();
    let last_connect = calls
        .iter()
        .rposition(|c| matches!(c, EngineCall::Connect { .. }))
        .unwrap();
    let first_insert = calls
        .iter()
        .position(|c| matches!(c, EngineCall::Insert { .. }))
        .unwrap();
    let first_record = calls
        .iter()
        .position(|c| matches!(c, EngineCall::SpikeDetector { .. }))
        .unwrap();

    assert!(last_create < first_connect);
    assert!(last_connect < first_insert);
    assert!(first_insert < first_record);
    assert_eq!(
        calls[first_record],
        EngineCall::SpikeDetector {
            section: "soma".into(),
            x: 0.5,
            threshold: 10.0,
        }
    );
}

#[test]
fn test_missing_mechanism() {
    let cell = BallAndStick::new(0).unwrap();
    let mut engine = InMemoryEngine::with_mechanisms(["extracellular", "pas", "na"]);
    let err = cell.instantiate(&mut engine).unwrap_err();
    assert!(matches!(err, CableError::MechanismNotFound(ref m) if m.starts_with("kv")));
}

// =============================================================================
// RECORDINGS
// =============================================================================

#[test]
fn test_recordings_during_run() {
    let cell = BallAndStick::new(3).unwrap();
    let mut engine = InMemoryEngine::new();
    let binding = cell.instantiate(&mut engine).unwrap();
    assert_eq!(binding.traces().len(), 3 + 201 + 11);

    let params = SimulationParams {
        dt: 0.5,
        tstop: 2.0,
        v_init: -70.0,
        ..Default::default()
    };
    let mut sim = SimulationContext::new(params);
    sim.start(&mut engine).unwrap();
    sim.advance(&mut engine).unwrap();

    let soma = binding.handle(cell.sections().soma).unwrap();
    engine.set_voltage(soma, 0.5, 30.0).unwrap();
    sim.advance(&mut engine).unwrap();
    sim.run(&mut engine).unwrap();
    assert_eq!(sim.state(), RunState::Stopped);

    let soma_v = engine.trace(binding.soma_v).unwrap();
    assert_eq!(soma_v.time, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    assert_eq!(soma_v.values, vec![-70.0, -70.0, 30.0, 30.0, 30.0]);

    let spikes = engine.trace(binding.spike_times).unwrap();
    assert_eq!(spikes.time, vec![1.0]);

    let ais_v = engine.trace(binding.ais_v).unwrap();
    assert!(ais_v.values.iter().all(|&v| v == -70.0));
    for id in binding.dend0_vs.iter().chain(&binding.dend1_vs) {
        assert_eq!(engine.trace(*id).unwrap().len(), 5);
    }
}

#[test]
fn test_recordings_do_not_alter_model() {
    let cell = BallAndStick::new(0).unwrap();
    let before = serde_json::to_string(cell.morphology()).unwrap();
    let mut engine = InMemoryEngine::new();
    let binding = cell.instantiate(&mut engine).unwrap();
    SimulationContext::default().run(&mut engine).unwrap();
    assert_eq!(serde_json::to_string(cell.morphology()).unwrap(), before);
    assert!(engine.trace(binding.soma_v).unwrap().len() > 1);
}

// =============================================================================
// MISC
// =============================================================================

#[test]
fn test_display_and_export() {
    let cell = BallAndStick::new(42).unwrap();
    assert_eq!(cell.to_string(), "BallAndStick[42]");
    assert_eq!(cell.gid(), 42);

    let json = serde_json::to_value(&cell).unwrap();
    assert_eq!(json["gid"], 42);
    assert_eq!(json["ais_mode"], "soma");
    assert_eq!(json["num_segments"], 315);
    assert_eq!(json["morphology"]["sections"].as_array().unwrap().len(), 9);
}
