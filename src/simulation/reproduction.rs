use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Summary of one evaluated generation and of how its successor was bred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation that was evaluated.
    pub generation: u32,
    /// Highest fitness.
    pub best_fitness: f32,
    /// Mean fitness.
    pub mean_fitness: f32,
    /// Median fitness.
    pub median_fitness: f32,
    /// Lowest fitness.
    pub worst_fitness: f32,
    /// Genomes kept by selection.
    pub survivors: usize,
    /// Offspring produced by crossover.
    pub crossover_offspring: usize,
    /// Offspring produced by plain cloning.
    pub cloned_offspring: usize,
    /// Offspring produced by clone-then-mutate.
    pub mutated_offspring: usize,
    /// Disqualified runs.
    pub disqualified: usize,
    /// Neural weight mutation rate applied to the offspring.
    pub neural_mutation_rate: f32,
}

impl GenerationStats {
    /// Fitness summary; non-finite values are ignored.
    pub fn from_fitness(generation: u32, fitness: &[f32]) -> Self {
        let mut values: Vec<f32> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
        values.sort_by(f32::total_cmp);

        let median = match values.len() {
            0 => 0.0,
            n if n % 2 == 1 => values[n / 2],
            n => (values[n / 2 - 1] + values[n / 2]) / 2.0,
        };
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f32>() / values.len() as f32
        };

        Self {
            generation,
            best_fitness: values.last().copied().unwrap_or(0.0),
            mean_fitness: mean,
            median_fitness: median,
            worst_fitness: values.first().copied().unwrap_or(0.0),
            ..Self::default()
        }
    }

    /// Offspring bred this generation.
    pub fn offspring(&self) -> usize {
        self.crossover_offspring + self.cloned_offspring + self.mutated_offspring
    }
}

/// Rolling history of generation statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsHistory {
    /// Recent generations, oldest first.
    pub entries: VecDeque<GenerationStats>,
    /// Maximum number of generations to keep
    pub max_history: usize,
}

impl Default for StatsHistory {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            max_history: 1000,
        }
    }
}

impl StatsHistory {
    /// Appends a generation, dropping the oldest beyond `max_history`.
    pub fn record(&mut self, stats: GenerationStats) {
        self.entries.push_back(stats);
        if self.entries.len() > self.max_history {
            self.entries.pop_front();
        }
    }

    /// Most recent generation.
    pub fn latest(&self) -> Option<&GenerationStats> {
        self.entries.back()
    }

    /// Highest best fitness on record
    pub fn best_fitness(&self) -> f32 {
        self.entries
            .iter()
            .map(|s| s.best_fitness)
            .fold(0.0, f32::max)
    }

    /// Change of best fitness between the oldest and newest entries.
    pub fn improvement(&self) -> f32 {
        match (self.entries.front(), self.entries.back()) {
            (Some(first), Some(last)) => last.best_fitness - first.best_fitness,
            _ => 0.0,
        }
    }

    /// Number of generations tracked
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
