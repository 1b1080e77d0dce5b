#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use softbody_evo::simulation::brain::Controller;
use softbody_evo::simulation::error::SessionError;
use softbody_evo::simulation::params::{ControllerKind, SimulationConfig};
use softbody_evo::simulation::session::EvolutionSession;
use std::fs;

fn create_test_config() -> SimulationConfig {
    SimulationConfig {
        population_size: 8,
        simulation_duration: 1.0,
        time_step: 1.0 / 30.0,
        physics_substeps: 4,
        ..SimulationConfig::default()
    }
}

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("softbody_evo_{}_{name}", std::process::id()))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn test_save_and_load() {
    let mut session = EvolutionSession::new(create_test_config()).expect("valid config");
    session.run_generation().expect("generation runs");

    let save_path = temp_path("session.json");
    session
        .save_to_file(&save_path)
        .expect("Failed to save session");

    let loaded = EvolutionSession::load_from_file(&save_path).expect("Failed to load session");

    assert_eq!(loaded.generation(), session.generation());
    assert_eq!(loaded.population(), session.population());
    assert_eq!(loaded.history().len(), session.history().len());
    assert_eq!(loaded.history().latest(), session.history().latest());

    fs::remove_file(save_path).ok();
}

#[test]
fn test_save_creates_valid_json() {
    let session = EvolutionSession::new(create_test_config()).expect("valid config");
    let save_path = temp_path("valid.json");

    session.save_to_file(&save_path).expect("Failed to save");

    let json_content = fs::read_to_string(&save_path).expect("Failed to read save file");
    let parsed: serde_json::Value = serde_json::from_str(&json_content).expect("Invalid JSON");

    assert!(parsed.get("config").is_some());
    assert!(parsed.get("population").is_some());
    assert!(parsed.get("generation").is_some());
    assert!(parsed.get("history").is_some());

    fs::remove_file(save_path).ok();
}

#[test]
fn test_load_nonexistent_file() {
    let result = EvolutionSession::load_from_file(&temp_path("missing.json"));
    assert!(matches!(result, Err(SessionError::Io(_))));
}

#[test]
fn test_load_invalid_json() {
    let invalid_path = temp_path("invalid.json");
    fs::write(&invalid_path, "{ this is not valid json }").expect("Failed to write test file");

    let result = EvolutionSession::load_from_file(&invalid_path);
    assert!(matches!(result, Err(SessionError::Json(_))));

    fs::remove_file(invalid_path).ok();
}

#[test]
fn test_load_rejects_invalid_genome() {
    let session = EvolutionSession::new(create_test_config()).expect("valid config");
    let save_path = temp_path("corrupt.json");
    session.save_to_file(&save_path).expect("Failed to save");

    let mut value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&save_path).expect("Failed to read"))
            .expect("valid JSON");
    value["population"][0]["nodes"][0]["size"] = serde_json::json!(1000.0);
    fs::write(&save_path, value.to_string()).expect("Failed to write");

    let result = EvolutionSession::load_from_file(&save_path);
    assert!(matches!(result, Err(SessionError::Validation(_))));

    fs::remove_file(save_path).ok();
}

#[test]
fn test_save_and_load_preserves_network_weights() {
    let config = SimulationConfig {
        controller: ControllerKind::NeuralFixed,
        ..create_test_config()
    };
    let session = EvolutionSession::new(config).expect("valid config");
    let save_path = temp_path("weights.json");

    session.save_to_file(&save_path).expect("Failed to save");
    let loaded = EvolutionSession::load_from_file(&save_path).expect("Failed to load");

    for (original, loaded) in session.population().iter().zip(loaded.population()) {
        match (&original.controller, &loaded.controller) {
            (Controller::NeuralFixed(a), Controller::NeuralFixed(b)) => {
                assert_eq!(a.topology, b.topology);
                for (x, y) in a.weights.iter().zip(&b.weights) {
                    assert!((x - y).abs() < 0.0001);
                }
            }
            other => panic!("unexpected controllers: {other:?}"),
        }
    }

    fs::remove_file(save_path).ok();
}

#[test]
fn test_load_and_continue_evolution() {
    let config = SimulationConfig {
        controller: ControllerKind::NeuralVariable,
        ..create_test_config()
    };
    let mut session = EvolutionSession::new(config).expect("valid config");
    session.run_generation().expect("generation runs");

    let save_path = temp_path("continue.json");
    session.save_to_file(&save_path).expect("Failed to save");
    let mut loaded = EvolutionSession::load_from_file(&save_path).expect("Failed to load");

    let original_stats = session.run_generation().expect("generation runs");
    let loaded_stats = loaded.run_generation().expect("generation runs");

    assert_eq!(loaded.generation(), 2);
    assert_eq!(loaded_stats, original_stats);
    assert_eq!(loaded.population(), session.population());
    assert_eq!(
        loaded.innovations().innovations_issued(),
        session.innovations().innovations_issued()
    );

    fs::remove_file(save_path).ok();
}

#[test]
fn test_config_defaults_fill_missing_fields() {
    let config: SimulationConfig =
        serde_json::from_str(r#"{ "population_size": 12, "controller": "neural_fixed" }"#)
            .expect("partial config parses");

    assert_eq!(config.population_size, 12);
    assert_eq!(config.controller, ControllerKind::NeuralFixed);
    assert_eq!(config.max_nodes, SimulationConfig::default().max_nodes);
    assert!(config.validate().is_ok());
}
