mod common;

use paretoforge_core::core_types::Origin;
use paretoforge_core::error::VariationError;
use paretoforge_core::history::GenerationRecord;
use paretoforge_core::optimizer::{
    Generative, LoopState, NoProgress, OptimizationLoop, OptimizationOptions, ProgressCallback,
};
use paretoforge_core::pareto::ParetoPopulation;
use paretoforge_core::protocol::{GenerativeRequest, Instruction};
use paretoforge_core::seeds::SeedCatalog;
use regex::Regex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

fn options() -> OptimizationOptions {
    OptimizationOptions::builder()
        .pop_size(6)
        .offspring_count(4)
        .max_generations(3)
        .rng_seed(21)
        .build()
}

#[test]
fn test_generation_budget() {
    let result = common::genetic_loop(options(), 2).run(NoProgress).unwrap();

    assert_eq!(result.state, LoopState::Terminated);
    assert_eq!(result.history.len(), 4);
    for (i, record) in result.history.generations().iter().enumerate() {
        assert_eq!(record.index, i);
        assert!(record.survivors.len() <= 6);
    }

    let gen0 = &result.history.generations()[0];
    assert_eq!(gen0.survivors.len(), 6);
    assert_eq!(gen0.survivors[0].origin, Origin::Seed);
    assert!(gen0.survivors[1..].iter().all(|c| c.origin == Origin::Mutation));
}

#[test]
fn test_population_has_no_duplicate_genomes() {
    let sha256 = Regex::new(r"^[0-9a-f]{64}$").unwrap();
    let result = common::genetic_loop(options(), 1).run(NoProgress).unwrap();
    for record in result.history.generations() {
        let fingerprints: HashSet<String> =
            record.survivors.iter().map(|c| c.fingerprint()).collect();
        assert_eq!(fingerprints.len(), record.survivors.len());
        assert!(fingerprints.iter().all(|f| sha256.is_match(f)));
    }
}

#[test]
fn test_evaluation_budget_stops_mid_run() {
    let mut opts = options();
    opts.max_generations = 50;
    opts.max_evaluations = 10;

    let result = common::genetic_loop(opts, 1).run(NoProgress).unwrap();
    assert!(result.evaluations <= 10);
    assert_eq!(result.history.last().unwrap().stats.evaluations, result.evaluations);
    assert!(result.history.len() < 51);
}

#[test]
fn test_evaluation_budget_caps_initial_population() {
    let mut opts = options();
    opts.max_evaluations = 3;

    let result = common::genetic_loop(opts, 2).run(NoProgress).unwrap();
    assert_eq!(result.evaluations, 3);
    assert_eq!(result.history.len(), 1);
    let gen0 = &result.history.generations()[0];
    assert_eq!(gen0.survivors.len(), 3);
    assert_eq!(gen0.stats.evaluations, 3);
}

#[test]
fn test_every_rejected_proposal_is_archived() {
    let codec = common::codec();
    let backend = |_: &GenerativeRequest| -> Result<String, VariationError> {
        Ok("I could not come up with a design.".to_string())
    };
    let operator = Generative::new(backend, Instruction::Mutation, common::objectives());
    let mut opts = options();
    opts.max_generations = 1;

    let result = OptimizationLoop::new(
        opts,
        codec.clone(),
        Box::new(operator),
        common::seed_mutation(),
        common::surrogate_pool(1),
        SeedCatalog::builtin(&codec).unwrap(),
    )
    .run(NoProgress)
    .unwrap();

    let gen1 = &result.history.generations()[1];
    assert_eq!(gen1.offspring.len(), 4);
    assert!(gen1.offspring.iter().all(|c| c.origin == Origin::Rejected && !c.feasible));
    assert_eq!(gen1.stats.evaluated, 4);
    assert_eq!(gen1.stats.invalid, 4);
    assert_eq!(gen1.stats.repeated, 0);
}

#[test]
fn test_surrogate_run_finds_feasible_front() {
    let result = common::genetic_loop(options(), 2).run(NoProgress).unwrap();
    let front = result.population.pareto_front();
    assert!(!front.is_empty());
    assert!(front.iter().all(|c| c.feasible && c.objectives.len() == 3));
}

struct StopAfter {
    generations: usize,
    seen: AtomicUsize,
}

impl ProgressCallback for StopAfter {
    fn on_generation(&self, record: &GenerationRecord, population: &ParetoPopulation) -> bool {
        assert_eq!(record.survivors.len(), population.len());
        self.seen.fetch_add(1, Ordering::SeqCst);
        record.index + 1 < self.generations
    }
}

#[test]
fn test_callback_can_stop_the_loop() {
    let mut optimizer = common::genetic_loop(options(), 1);
    let stop = optimizer.stop_handle();
    let callback = StopAfter {
        generations: 2,
        seen: AtomicUsize::new(0),
    };

    let result = optimizer.run(callback).unwrap();
    assert_eq!(result.history.len(), 2);
    assert_eq!(optimizer.state(), LoopState::Terminated);
    assert!(stop.load(Ordering::SeqCst));
}
