#![allow(missing_docs)]
#![allow(clippy::float_cmp)]

use proptest::prelude::*;
use softbody_evo::simulation::brain::InnovationRegistry;
use softbody_evo::simulation::error::{ConfigError, EvolutionError, SessionError};
use softbody_evo::simulation::evolution::{
    EvolutionEngine, neural_mutation_rate, rank_weights, select_survivors,
};
use softbody_evo::simulation::genome::{CreatureGenome, generate_random_genome};
use softbody_evo::simulation::ids::IdAllocator;
use softbody_evo::simulation::params::{RateDecay, SimulationConfig, survivor_count};
use softbody_evo::simulation::reproduction::{GenerationStats, StatsHistory};
use softbody_evo::simulation::rng::create_rng;
use softbody_evo::simulation::session::EvolutionSession;

fn create_test_config() -> SimulationConfig {
    SimulationConfig {
        population_size: 10,
        simulation_duration: 1.0,
        time_step: 1.0 / 30.0,
        physics_substeps: 4,
        ..SimulationConfig::default()
    }
}

fn scored_population(
    config: &SimulationConfig,
    ids: &mut IdAllocator,
    innovations: &mut InnovationRegistry,
) -> Vec<(CreatureGenome, f32)> {
    let mut rng = create_rng(config.seed);
    (0..config.population_size)
        .map(|i| {
            let genome = generate_random_genome(config, ids, innovations, &mut rng);
            (genome, i as f32)
        })
        .collect()
}

#[test]
fn test_survivor_count() {
    assert_eq!(survivor_count(10, 0.5), 5);
    assert_eq!(survivor_count(10, 0.3), 7);
    assert_eq!(survivor_count(10, 0.0), 10);
    assert_eq!(survivor_count(10, 1.0), 1);
    assert_eq!(survivor_count(3, 0.9), 1);
    assert_eq!(survivor_count(1, 0.5), 1);
    assert_eq!(survivor_count(10, 0.7), 3);
}

#[test]
fn test_survivor_count_does_not_round_up_near_integers() {
    // 7 * (1 - 0.71429) = 1.99997
    assert_eq!(survivor_count(7, 0.71429), 1);
    assert_eq!(select_survivors(&[1.0; 7], 0.71429).len(), 1);
}

#[test]
fn test_select_survivors_best_first() {
    let fitness = [3.0, 9.0, 1.0, 7.0, 5.0, 2.0];
    assert_eq!(select_survivors(&fitness, 0.5), vec![1, 3, 4]);
}

#[test]
fn test_select_survivors_is_stable_on_ties() {
    let fitness = [1.0, 2.0, 2.0, 2.0];
    assert_eq!(select_survivors(&fitness, 0.5), vec![1, 2]);
}

#[test]
fn test_select_survivors_ranks_nan_last() {
    let fitness = [f32::NAN, 0.5, 0.1, f32::INFINITY];
    assert_eq!(select_survivors(&fitness, 0.5), vec![1, 2]);
    assert!(select_survivors(&[], 0.5).is_empty());
}

#[test]
fn test_rank_weights_small() {
    let weights = rank_weights(4);
    assert_eq!(weights, vec![0.4, 0.3, 0.2, 0.1]);
    assert_eq!(rank_weights(1), vec![1.0]);
}

proptest! {
    #[test]
    fn proptest_survivor_count_matches_decimal_floor(n in 1usize..500, permille in 0u32..=1000) {
        let cull = permille as f32 / 1000.0;
        let exact = (n * (1000 - permille as usize)) / 1000;
        prop_assert_eq!(survivor_count(n, cull), exact.max(1));
    }

    #[test]
    fn proptest_survivor_count_never_exceeds_floor(n in 1usize..500, cull in 0.0f32..=1.0) {
        let product = n as f64 * (1.0 - f64::from(cull));
        let floor = (product.floor() as usize).max(1);
        let count = survivor_count(n, cull);
        // Only a product within f32 rounding of the next integer may round up.
        let near_next = (product.floor() + 1.0 - product) <= n as f64 * f64::from(f32::EPSILON);
        prop_assert!(count == floor || (near_next && count == floor + 1));
    }

    #[test]
    fn proptest_rank_weights_normalized_and_decreasing(n in 1usize..300) {
        let weights = rank_weights(n);
        prop_assert_eq!(weights.len(), n);
        let sum: f32 = weights.iter().sum();
        prop_assert!((sum - 1.0).abs() < 1e-4);
        for pair in weights.windows(2) {
            prop_assert!(pair[0] > pair[1]);
        }
        prop_assert!(weights.iter().all(|&w| w > 0.0));
    }

    #[test]
    fn proptest_decay_stays_between_rates(generation in 0u32..500, end in 0.001f32..0.2) {
        let start = (end * 5.0).min(0.5);
        for decay in [RateDecay::Linear, RateDecay::Exponential] {
            let rate = neural_mutation_rate(generation, end, decay);
            prop_assert!(rate <= start + 1e-6);
            prop_assert!(rate >= end - 1e-6);
        }
    }
}

#[test]
fn test_neural_rate_decay_schedule() {
    let end = 0.05;

    for decay in [RateDecay::Linear, RateDecay::Exponential] {
        assert!((neural_mutation_rate(0, end, decay) - 0.25).abs() < 1e-6);
        assert!((neural_mutation_rate(1000, end, decay) - end).abs() < 1e-4);
    }
    assert!((neural_mutation_rate(25, end, RateDecay::Linear) - 0.15).abs() < 1e-6);
    assert!((neural_mutation_rate(50, end, RateDecay::Linear) - end).abs() < 1e-6);
    assert_eq!(neural_mutation_rate(0, end, RateDecay::Off), end);
    assert_eq!(neural_mutation_rate(300, end, RateDecay::Off), end);

    // The start rate is capped at 0.5.
    assert!((neural_mutation_rate(0, 0.2, RateDecay::Exponential) - 0.5).abs() < 1e-6);
}

#[test]
fn test_next_generation_keeps_survivors_unchanged() {
    let config = SimulationConfig {
        cull_percentage: 0.5,
        ..create_test_config()
    };
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let scored = scored_population(&config, &mut ids, &mut innovations);
    let mut rng = create_rng(1);

    let (next, stats) = EvolutionEngine::new(&config)
        .next_generation(&scored, 0, &mut ids, &mut innovations, &mut rng)
        .expect("evolution succeeds");

    assert_eq!(next.len(), 10);
    assert_eq!(stats.survivors, 5);
    assert_eq!(stats.offspring(), 5);

    // Fitness equals the index, so survivors are 9, 8, 7, 6, 5.
    for (kept, original) in next.iter().zip([9, 8, 7, 6, 5]) {
        let parent = &scored[original].0;
        assert_eq!(kept.id, parent.id);
        assert_eq!(kept.survival_streak, parent.survival_streak + 1);
        let mut expected = parent.clone();
        expected.survival_streak += 1;
        assert_eq!(kept, &expected);
    }

    let parent_ids: Vec<_> = scored[5..].iter().map(|(g, _)| g.id).collect();
    for child in &next[5..] {
        assert!(!scored.iter().any(|(g, _)| g.id == child.id));
        assert_eq!(child.survival_streak, 0);
        assert!(child.parent_ids.iter().all(|id| parent_ids.contains(id)));
        assert!(!child.ancestry.is_empty());
        assert_eq!(child.validate(&config), Ok(()));
    }
}

#[test]
fn test_best_genome_always_survives() {
    let config = create_test_config();
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let mut scored = scored_population(&config, &mut ids, &mut innovations);
    scored[3].1 = 1000.0;
    let best = scored[3].0.id;
    let mut rng = create_rng(2);

    let (next, stats) = EvolutionEngine::new(&config)
        .next_generation(&scored, 0, &mut ids, &mut innovations, &mut rng)
        .expect("evolution succeeds");

    assert_eq!(next[0].id, best);
    assert_eq!(stats.best_fitness, 1000.0);
}

#[test]
fn test_reproduction_without_operators_clones() {
    let config = SimulationConfig {
        use_crossover: false,
        use_mutation: false,
        ..create_test_config()
    };
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let scored = scored_population(&config, &mut ids, &mut innovations);
    let mut rng = create_rng(3);

    let (next, stats) = EvolutionEngine::new(&config)
        .next_generation(&scored, 4, &mut ids, &mut innovations, &mut rng)
        .expect("evolution succeeds");

    assert_eq!(stats.crossover_offspring, 0);
    assert_eq!(stats.mutated_offspring, 0);
    assert_eq!(stats.cloned_offspring, 5);
    for child in &next[5..] {
        assert_eq!(child.parent_ids.len(), 1);
    }
}

#[test]
fn test_crossover_only_reproduction() {
    let config = SimulationConfig {
        crossover_rate: 1.0,
        ..create_test_config()
    };
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let scored = scored_population(&config, &mut ids, &mut innovations);
    let mut rng = create_rng(4);

    let (next, stats) = EvolutionEngine::new(&config)
        .next_generation(&scored, 0, &mut ids, &mut innovations, &mut rng)
        .expect("evolution succeeds");

    assert_eq!(stats.crossover_offspring, 5);
    for child in &next[5..] {
        assert_eq!(child.parent_ids.len(), 2);
        assert_ne!(child.parent_ids[0], child.parent_ids[1]);
        assert_eq!(child.generation, 1);
    }
}

#[test]
fn test_empty_population_is_rejected() {
    let config = create_test_config();
    let mut ids = IdAllocator::new();
    let mut innovations = InnovationRegistry::new();
    let mut rng = create_rng(5);

    let result =
        EvolutionEngine::new(&config).next_generation(&[], 0, &mut ids, &mut innovations, &mut rng);
    assert_eq!(result.err(), Some(EvolutionError::EmptyPopulation));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = SimulationConfig {
        cull_percentage: 1.5,
        ..create_test_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange {
            field: "cull_percentage",
            ..
        })
    ));
    assert!(matches!(
        EvolutionSession::new(config),
        Err(SessionError::Config(_))
    ));

    let config = SimulationConfig {
        min_nodes: 6,
        max_nodes: 4,
        ..create_test_config()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBounds { .. })
    ));
}

#[test]
fn test_session_advances_one_generation() {
    let mut session = EvolutionSession::new(create_test_config()).expect("valid config");
    assert_eq!(session.generation(), 0);
    assert_eq!(session.population().len(), 10);

    let stats = session.run_generation().expect("generation runs");

    assert_eq!(stats.generation, 0);
    assert_eq!(session.generation(), 1);
    assert_eq!(session.population().len(), 10);
    assert_eq!(session.history().len(), 1);
    assert!(stats.best_fitness >= stats.mean_fitness);
    assert!(stats.mean_fitness >= stats.worst_fitness);
    assert!(stats.worst_fitness >= 0.0);
}

#[test]
fn test_sessions_are_deterministic() {
    let mut a = EvolutionSession::new(create_test_config()).expect("valid config");
    let mut b = EvolutionSession::new(create_test_config()).expect("valid config");
    assert_eq!(a.population(), b.population());

    for _ in 0..2 {
        let stats_a = a.run_generation().expect("generation runs");
        let stats_b = b.run_generation().expect("generation runs");
        assert_eq!(stats_a, stats_b);
    }
    assert_eq!(a.population(), b.population());
}

#[test]
fn test_different_seeds_diverge() {
    let a = EvolutionSession::new(create_test_config()).expect("valid config");
    let b = EvolutionSession::new(SimulationConfig {
        seed: 7,
        ..create_test_config()
    })
    .expect("valid config");
    assert_ne!(a.population(), b.population());
}

#[test]
fn test_generation_stats_summary() {
    let stats = GenerationStats::from_fitness(3, &[4.0, 1.0, f32::NAN, 3.0, 2.0]);
    assert_eq!(stats.generation, 3);
    assert_eq!(stats.best_fitness, 4.0);
    assert_eq!(stats.worst_fitness, 1.0);
    assert_eq!(stats.mean_fitness, 2.5);
    assert_eq!(stats.median_fitness, 2.5);
}

#[test]
fn test_stats_history_is_bounded() {
    let mut history = StatsHistory {
        max_history: 3,
        ..StatsHistory::default()
    };
    for generation in 0..5 {
        history.record(GenerationStats {
            generation,
            best_fitness: generation as f32 * 2.0,
            ..GenerationStats::default()
        });
    }

    assert_eq!(history.len(), 3);
    assert_eq!(history.latest().map(|s| s.generation), Some(4));
    assert_eq!(history.best_fitness(), 8.0);
    assert_eq!(history.improvement(), 4.0);
}
