#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use softbody_evo::simulation::brain::InnovationRegistry;
use softbody_evo::simulation::error::ReplayError;
use softbody_evo::simulation::genome::generate_random_genome;
use softbody_evo::simulation::ids::IdAllocator;
use softbody_evo::simulation::params::SimulationConfig;
use softbody_evo::simulation::replay::{decode_frame, encode_frame, encode_frames};
use softbody_evo::simulation::rng::create_rng;
use softbody_evo::simulation::simulator::{CreatureSimulationResult, simulate_creature};

fn create_test_config() -> SimulationConfig {
    SimulationConfig {
        population_size: 10,
        simulation_duration: 1.0,
        time_step: 1.0 / 30.0,
        physics_substeps: 4,
        ..SimulationConfig::default()
    }
}

fn simulated_run(config: &SimulationConfig, seed: u64) -> CreatureSimulationResult {
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let mut rng = create_rng(seed);
    let genome = generate_random_genome(config, &mut ids, &mut innovations, &mut rng);
    simulate_creature(&genome, config, seed).expect("valid genome")
}

#[test]
fn test_encode_frame_layout() {
    let config = create_test_config();
    let result = simulated_run(&config, 1);
    let frame = &result.frames[0];

    let record = encode_frame(frame);

    assert_eq!(record.len(), 1 + 3 * result.genome.nodes.len());
    assert_eq!(record[0], frame.time);
    for (i, (_, position)) in frame.positions.iter().enumerate() {
        assert_eq!(record[1 + 3 * i], position.x);
        assert_eq!(record[2 + 3 * i], position.y);
        assert_eq!(record[3 + 3 * i], position.z);
    }
}

#[test]
fn test_decode_restores_frames() {
    let config = create_test_config();
    let result = simulated_run(&config, 2);
    let records = encode_frames(&result.frames);
    assert_eq!(records.len(), result.frames.len());

    for (index, (record, frame)) in records.iter().zip(&result.frames).enumerate() {
        let decoded =
            decode_frame(record, &result.genome, &result.pellets, index).expect("valid record");

        assert_eq!(decoded.time, frame.time);
        assert_eq!(decoded.positions, frame.positions);
        assert_eq!(decoded.active_pellet, frame.active_pellet);
        let drift = decoded.center_of_mass - frame.center_of_mass;
        assert!(drift.length() < 1e-4);
    }
}

#[test]
fn test_decode_rejects_wrong_length() {
    let config = create_test_config();
    let result = simulated_run(&config, 3);
    let mut record = encode_frame(&result.frames[0]);
    record.pop();

    let expected = 1 + 3 * result.genome.nodes.len();
    assert_eq!(
        decode_frame(&record, &result.genome, &result.pellets, 0),
        Err(ReplayError::RecordLength {
            expected,
            actual: expected - 1
        })
    );
}

#[test]
fn test_decode_rejects_empty_record() {
    let config = create_test_config();
    let result = simulated_run(&config, 4);

    assert_eq!(
        decode_frame(&[], &result.genome, &result.pellets, 0),
        Err(ReplayError::Empty)
    );
}
