#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use softbody_evo::simulation::brain::InnovationRegistry;
use softbody_evo::simulation::genome::{CreatureGenome, generate_random_genome};
use glam::Vec3;
use softbody_evo::simulation::ids::IdAllocator;
use softbody_evo::simulation::params::{ProprioceptionFlags, SimulationConfig, TimeEncoding};
use softbody_evo::simulation::pellet::PelletField;
use softbody_evo::simulation::physics::BodyState;
use softbody_evo::simulation::rng::create_rng;
use softbody_evo::simulation::senses::{
    ClockSense, GroundContactSense, MuscleStrainSense, NodeVelocitySense, PelletReading,
    PelletSense, Perception, Sense, SensorContext,
};

fn create_test_config() -> SimulationConfig {
    let mut config = SimulationConfig {
        population_size: 10,
        simulation_duration: 1.0,
        time_step: 1.0 / 30.0,
        physics_substeps: 4,
        ..SimulationConfig::default()
    };
    config.neural.time_encoding = TimeEncoding::SinCos;
    config.neural.proprioception = ProprioceptionFlags {
        muscle_strain: true,
        node_velocity: true,
        ground_contact: true,
    };
    config
}

fn random_genome(config: &SimulationConfig, seed: u64) -> CreatureGenome {
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let mut rng = create_rng(seed);
    generate_random_genome(config, &mut ids, &mut innovations, &mut rng)
}

#[test]
fn test_sense_sizes_and_names() {
    let config = create_test_config();

    assert_eq!(PelletSense.input_size(&config), 7);
    assert_eq!(ClockSense.input_size(&config), 2);
    assert_eq!(MuscleStrainSense.input_size(&config), config.max_muscles);
    assert_eq!(NodeVelocitySense.input_size(&config), config.max_nodes * 3);
    assert_eq!(GroundContactSense.input_size(&config), config.max_nodes);

    assert_eq!(PelletSense.name(), "Pellet");
    assert_eq!(ClockSense.name(), "Clock");
    assert_eq!(MuscleStrainSense.name(), "MuscleStrain");
    assert_eq!(NodeVelocitySense.name(), "NodeVelocity");
    assert_eq!(GroundContactSense.name(), "GroundContact");
}

#[test]
fn test_time_encoding_widths() {
    let mut config = create_test_config();
    for (encoding, width) in [
        (TimeEncoding::None, 0),
        (TimeEncoding::Sin, 1),
        (TimeEncoding::Raw, 1),
        (TimeEncoding::SinCos, 2),
        (TimeEncoding::SinRaw, 2),
    ] {
        config.neural.time_encoding = encoding;
        assert_eq!(ClockSense.input_size(&config), width);
    }
}

#[test]
fn test_perception_from_config_order() {
    let config = create_test_config();
    let perception = Perception::from_config(&config);

    let names: Vec<_> = perception.senses().iter().map(|s| s.name()).collect();
    assert_eq!(
        names,
        vec!["Pellet", "Clock", "MuscleStrain", "NodeVelocity", "GroundContact"]
    );
    assert_eq!(perception.total_input_size(&config), 7 + 2 + 15 + 24 + 8);
}

#[test]
fn test_default_pipeline_is_pellet_only() {
    let config = SimulationConfig::default();
    let perception = Perception::from_config(&config);

    assert_eq!(perception.senses().len(), 1);
    assert_eq!(perception.total_input_size(&config), 7);
}

#[test]
fn test_real_input_size_excludes_padding() {
    let config = create_test_config();
    let genome = random_genome(&config, 1);
    let perception = Perception::from_config(&config);

    let n = genome.nodes.len();
    let m = genome.muscles.len();
    assert_eq!(perception.real_input_size(&genome, &config), 7 + 2 + m + 3 * n + n);
    assert!(perception.real_input_size(&genome, &config) <= perception.total_input_size(&config));
}

#[test]
fn test_perceive_pads_unused_slots() {
    let config = create_test_config();
    let genome = random_genome(&config, 2);
    let mut body = BodyState::from_genome(&genome).expect("valid genome");
    for node in &mut body.nodes {
        node.velocity = Vec3::new(5.0, -5.0, 5.0);
        node.on_ground = true;
    }
    let mut pellets = PelletField::new(&config, 3);
    pellets.spawn_next(body.center_of_mass(), 0);
    let rest_lengths: Vec<f32> = body.springs.iter().map(|s| s.base_length).collect();

    let context = SensorContext {
        config: &config,
        genome: &genome,
        body: &body,
        rest_lengths: &rest_lengths,
        reading: PelletReading::measure(&body, &pellets, &config),
        time: 0.25,
    };
    let perception = Perception::from_config(&config);
    let inputs = perception.perceive(&context);

    assert_eq!(inputs.len(), perception.total_input_size(&config));
    assert!(inputs.iter().all(|v| v.is_finite()));

    let (n, m) = (genome.nodes.len(), genome.muscles.len());
    let strain = 9;
    let velocity = strain + config.max_muscles;
    let contact = velocity + config.max_nodes * 3;

    assert!(inputs.slice(ndarray::s![strain + m..velocity]).iter().all(|&v| v == 0.0));
    assert!(inputs.slice(ndarray::s![velocity + 3 * n..contact]).iter().all(|&v| v == 0.0));
    assert!(inputs.slice(ndarray::s![contact..contact + n]).iter().all(|&v| v == 1.0));
    assert!(inputs.slice(ndarray::s![contact + n..]).iter().all(|&v| v == 0.0));

    assert!((inputs[velocity] - 0.1).abs() < 1e-6);
    assert!((inputs[velocity + 1] + 0.1).abs() < 1e-6);
}

#[test]
fn test_clock_sense_encodings() {
    let mut config = create_test_config();
    let genome = random_genome(&config, 4);
    let body = BodyState::from_genome(&genome).expect("valid genome");
    let pellets = PelletField::new(&config, 1);

    for (encoding, expected) in [
        (TimeEncoding::Sin, vec![1.0]),
        (TimeEncoding::Raw, vec![0.25]),
        (TimeEncoding::SinCos, vec![1.0, 0.0]),
        (TimeEncoding::SinRaw, vec![1.0, 0.25]),
    ] {
        config.neural.time_encoding = encoding;
        let context = SensorContext {
            config: &config,
            genome: &genome,
            body: &body,
            rest_lengths: &[],
            reading: PelletReading::measure(&body, &pellets, &config),
            time: 0.25,
        };
        let values = ClockSense.sense(&context);
        assert_eq!(values.len(), expected.len());
        for (v, e) in values.iter().zip(&expected) {
            assert!((v - e).abs() < 1e-5, "{encoding:?}: {v} != {e}");
        }
    }
}

#[test]
fn test_pellet_reading() {
    let config = create_test_config();
    let genome = random_genome(&config, 5);
    let body = BodyState::from_genome(&genome).expect("valid genome");
    let mut pellets = PelletField::new(&config, 6);

    let empty = PelletReading::measure(&body, &pellets, &config);
    assert_eq!(empty.direction, Vec3::ZERO);
    assert_eq!(empty.normalized_distance, 0.0);

    pellets.spawn_next(body.center_of_mass(), 0);
    let reading = PelletReading::measure(&body, &pellets, &config);
    assert!((reading.direction.length() - 1.0).abs() < 1e-4);
    assert!(reading.normalized_distance > 0.0 && reading.normalized_distance <= 1.0);
    // The body starts at rest.
    assert_eq!(reading.velocity_direction, Vec3::ZERO);
}

#[test]
fn test_muscle_strain_sign() {
    let config = create_test_config();
    let genome = random_genome(&config, 7);
    let body = BodyState::from_genome(&genome).expect("valid genome");
    let pellets = PelletField::new(&config, 1);
    // Halving the rest length makes every muscle read as stretched.
    let rest_lengths: Vec<f32> = (0..body.springs.len())
        .map(|k| body.spring_length(k) * 0.5)
        .collect();

    let context = SensorContext {
        config: &config,
        genome: &genome,
        body: &body,
        rest_lengths: &rest_lengths,
        reading: PelletReading::measure(&body, &pellets, &config),
        time: 0.0,
    };
    let strain = MuscleStrainSense.sense(&context);

    for k in 0..genome.muscles.len() {
        assert!((strain[k] - 1.0).abs() < 1e-4);
    }
}
