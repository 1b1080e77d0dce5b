//! Headless runner that evolves a population and logs per-generation statistics.

use anyhow::Context;
use softbody_evo::simulation::params::SimulationConfig;
use softbody_evo::simulation::session::EvolutionSession;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_GENERATIONS: u32 = 20;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Usage: `softbody-evo [config.json] [generations] [checkpoint.json]`
fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            serde_json::from_str::<SimulationConfig>(&json)
                .with_context(|| format!("parsing config {path}"))?
        }
        _ => SimulationConfig::default(),
    };
    let generations = match args.next() {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("invalid generation count '{raw}'"))?,
        None => DEFAULT_GENERATIONS,
    };
    let checkpoint = args.next();

    let mut session = EvolutionSession::new(config).context("creating session")?;
    info!(generations, "starting evolution");

    for _ in 0..generations {
        let stats = session.run_generation()?;
        info!(
            generation = stats.generation,
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            median = stats.median_fitness,
            disqualified = stats.disqualified,
            crossover = stats.crossover_offspring,
            mutated = stats.mutated_offspring,
            "generation complete"
        );
    }

    if let Some(path) = checkpoint {
        session
            .save_to_file(&path)
            .with_context(|| format!("saving checkpoint {path}"))?;
        info!(%path, "checkpoint saved");
    }

    info!(
        best = session.history().best_fitness(),
        improvement = session.history().improvement(),
        "evolution finished"
    );
    Ok(())
}
