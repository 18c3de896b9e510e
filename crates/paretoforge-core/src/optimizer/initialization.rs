use crate::consts::SEED_FILL_ATTEMPTS_PER_SLOT;
use crate::core_types::{Candidate, Origin};
use crate::optimizer::mutation::Mutation;
use crate::seeds::SeedCatalog;
use fastrand::Rng;
use std::collections::HashSet;
use tracing::{info, warn};

/// Unevaluated generation-0 candidates: the catalog seeds first, then mutated
/// copies of random seeds until `pop_size` distinct genomes exist.
pub fn build_initial_population(
    catalog: &SeedCatalog,
    mutation: &Mutation,
    pop_size: usize,
    rng: &mut Rng,
) -> Vec<Candidate> {
    let mut population: Vec<Candidate> = Vec::with_capacity(pop_size);
    let mut seen: HashSet<String> = HashSet::new();

    for seed in catalog.seeds().iter().take(pop_size) {
        if seen.insert(seed.fingerprint()) {
            population.push(Candidate::from_genome(seed, Origin::Seed, 0));
        }
    }
    let literal = population.len();

    let seeds = catalog.seeds();
    let mut attempts = (pop_size - population.len()) * SEED_FILL_ATTEMPTS_PER_SLOT;
    while population.len() < pop_size && attempts > 0 && !seeds.is_empty() {
        attempts -= 1;
        let parent = &seeds[rng.usize(0..seeds.len())];
        let child = match mutation.mutate(parent, rng) {
            Ok(child) => child,
            Err(e) => {
                warn!("Seed mutation failed: {}", e);
                continue;
            }
        };
        if seen.insert(child.fingerprint()) {
            population.push(Candidate::from_genome(&child, Origin::Mutation, 0));
        }
    }

    if population.len() < pop_size {
        warn!(
            "⚠️ Only {} distinct initial candidates (wanted {})",
            population.len(),
            pop_size
        );
    }
    info!(
        "🌱 Initial population: {} seeds + {} mutated",
        literal,
        population.len() - literal
    );

    population
}
