use crate::codec::GenomeCodec;
use crate::config::{Config, ParentSelection};
use crate::consts::CHECKPOINT_FORMAT_VERSION;
use crate::core_types::{Candidate, Genome, Origin};
use crate::error::ForgeResult;
use crate::fitness::EvaluationPool;
use crate::history::{Checkpoint, GenerationRecord, GenerationStats, HistoryBuffer};
use crate::optimizer::initialization::build_initial_population;
use crate::optimizer::mutation::Mutation;
use crate::optimizer::variation::{Parent, VariationOperator};
use crate::pareto::{dedup, ParetoPopulation};
use crate::seeds::SeedCatalog;
use fastrand::Rng;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strum::Display;
use tracing::{error, info, warn};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
pub struct OptimizationOptions {
    #[builder(default = 20)]
    pub pop_size: usize,
    #[builder(default = 20)]
    pub offspring_count: usize,
    #[builder(default = 50)]
    pub max_generations: usize,
    /// 0 disables the evaluation budget.
    #[builder(default = 0)]
    pub max_evaluations: usize,
    #[builder(default = ParentSelection::Tournament)]
    pub parent_selection: ParentSelection,
    #[builder(default = 2)]
    pub tournament_size: usize,
    #[builder(default = 42)]
    pub rng_seed: u64,
    #[builder(default = 1)]
    pub checkpoint_every: usize,
    #[builder(default, setter(strip_option))]
    pub checkpoint_path: Option<PathBuf>,
    #[builder(default = false)]
    pub resume: bool,
    #[builder(default, setter(into))]
    pub run_id: String,
}

impl From<&Config> for OptimizationOptions {
    fn from(cfg: &Config) -> Self {
        OptimizationOptions::builder()
            .pop_size(cfg.search.pop_size)
            .offspring_count(cfg.search.offspring_count)
            .max_generations(cfg.search.max_generations)
            .max_evaluations(cfg.search.max_evaluations)
            .parent_selection(cfg.search.parent_selection)
            .tournament_size(cfg.search.tournament_size)
            .rng_seed(cfg.search.rng_seed)
            .checkpoint_every(cfg.search.checkpoint_every.max(1))
            .build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoopState {
    Initializing,
    Running,
    Terminated,
    Failed,
}

pub trait ProgressCallback: Send + Sync {
    /// Called after every archived generation. `false` requests a stop.
    fn on_generation(&self, record: &GenerationRecord, population: &ParetoPopulation) -> bool;
}

pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_generation(&self, _: &GenerationRecord, _: &ParetoPopulation) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct OptimizationResult {
    pub state: LoopState,
    pub history: HistoryBuffer,
    pub population: ParetoPopulation,
    pub evaluations: usize,
}

/// Mutable state of a run, restorable from a checkpoint.
struct RunProgress {
    history: HistoryBuffer,
    population: ParetoPopulation,
    evaluations: usize,
    rng: Rng,
    saved_len: usize,
}

pub struct OptimizationLoop {
    options: OptimizationOptions,
    codec: GenomeCodec,
    operator: Box<dyn VariationOperator>,
    seed_mutation: Mutation,
    pool: EvaluationPool,
    catalog: SeedCatalog,
    stop: Arc<AtomicBool>,
    state: LoopState,
}

impl OptimizationLoop {
    pub fn new(
        options: OptimizationOptions,
        codec: GenomeCodec,
        operator: Box<dyn VariationOperator>,
        seed_mutation: Mutation,
        pool: EvaluationPool,
        catalog: SeedCatalog,
    ) -> Self {
        Self {
            options,
            codec,
            operator,
            seed_mutation,
            pool,
            catalog,
            stop: Arc::new(AtomicBool::new(false)),
            state: LoopState::Initializing,
        }
    }

    /// Raising this flag abandons the generation being evaluated.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Shares an externally owned stop flag, e.g. one raised by a signal handler.
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn run<CB: ProgressCallback>(&mut self, callback: CB) -> ForgeResult<OptimizationResult> {
        self.state = LoopState::Initializing;
        match self.execute(&callback) {
            Ok(result) => {
                self.state = result.state;
                Ok(result)
            }
            Err(e) => {
                self.state = LoopState::Failed;
                error!("❌ Optimization failed: {}", e);
                Err(e)
            }
        }
    }

    fn execute<CB: ProgressCallback>(&mut self, callback: &CB) -> ForgeResult<OptimizationResult> {
        let opts = self.options.clone();

        let restored = self.restore()?;
        let mut progress = match restored {
            Some(p) => p,
            None => match self.initialize(callback)? {
                Some(p) => p,
                None => {
                    return Ok(OptimizationResult {
                        state: LoopState::Terminated,
                        history: HistoryBuffer::new(),
                        population: ParetoPopulation::default(),
                        evaluations: 0,
                    });
                }
            },
        };

        self.state = LoopState::Running;
        loop {
            let generation = progress.history.len();
            if generation > opts.max_generations {
                info!("🏁 Generation budget reached");
                break;
            }
            let remaining = match opts.max_evaluations {
                0 => usize::MAX,
                max => max.saturating_sub(progress.evaluations),
            };
            if remaining == 0 {
                info!("🏁 Evaluation budget reached ({})", progress.evaluations);
                break;
            }
            if self.stop.load(Ordering::Relaxed) {
                break;
            }

            // Sequential, seeded: the only consumer of the random stream
            let stream_before = progress.rng.get_seed();
            let proposals = self.breed(&progress.population, generation, &mut progress.rng);

            let mut seen: HashSet<String> = progress
                .population
                .members()
                .iter()
                .map(Candidate::fingerprint)
                .collect();
            let (mut batch, repeated) = dedup(proposals, &mut seen);
            batch.truncate(remaining);

            // Parallel: evaluation only
            let Some(outcome) = self.pool.evaluate_batch(&batch, &self.stop) else {
                // A resume must breed this generation again from the same stream
                progress.rng = Rng::with_seed(stream_before);
                info!("🛑 Stop requested; generation {} discarded", generation);
                break;
            };
            progress.evaluations += outcome.candidates.len();

            let (merged, merge_repeated) = ParetoPopulation::merge(
                progress.population.members().to_vec(),
                outcome.candidates.clone(),
            );
            progress.population = merged.select_survivors(opts.pop_size);

            let stats = Self::stats(
                &progress.population,
                outcome.candidates.len(),
                outcome.invalid,
                repeated + merge_repeated,
                progress.evaluations,
            );
            let record = GenerationRecord {
                index: generation,
                survivors: progress.population.members().to_vec(),
                offspring: outcome.candidates,
                stats,
            };
            if !self.archive(&mut progress, record, callback)? {
                self.stop.store(true, Ordering::Relaxed);
                info!("🛑 Stop requested by progress callback");
                break;
            }
        }

        if progress.saved_len != progress.history.len() {
            self.save(&progress)?;
        }

        Ok(OptimizationResult {
            state: LoopState::Terminated,
            history: progress.history,
            population: progress.population,
            evaluations: progress.evaluations,
        })
    }

    fn restore(&self) -> ForgeResult<Option<RunProgress>> {
        let opts = &self.options;
        let Some(path) = opts.checkpoint_path.as_ref().filter(|_| opts.resume) else {
            return Ok(None);
        };
        if !path.exists() {
            info!("No checkpoint at {:?}; starting fresh", path);
            return Ok(None);
        }

        let checkpoint = Checkpoint::load(path)?;
        checkpoint.verify(&opts.run_id, self.pool.evaluator().objectives())?;
        info!(
            "♻️ Resuming from {:?}: {} generations, {} evaluations",
            path,
            checkpoint.history.len(),
            checkpoint.evaluations
        );

        let saved_len = checkpoint.history.len();
        Ok(Some(RunProgress {
            history: checkpoint.history,
            population: ParetoPopulation::new(checkpoint.population),
            evaluations: checkpoint.evaluations,
            rng: Rng::with_seed(checkpoint.rng_seed),
            saved_len,
        }))
    }

    /// Builds, evaluates and archives generation 0. `None` if stopped first.
    fn initialize<CB: ProgressCallback>(&self, callback: &CB) -> ForgeResult<Option<RunProgress>> {
        let opts = &self.options;
        let mut rng = Rng::with_seed(opts.rng_seed);

        let mut initial =
            build_initial_population(&self.catalog, &self.seed_mutation, opts.pop_size, &mut rng);
        if opts.max_evaluations > 0 && initial.len() > opts.max_evaluations {
            warn!(
                "Evaluation budget {} is below the population size; evaluating {} of {} initial candidates",
                opts.max_evaluations,
                opts.max_evaluations,
                initial.len()
            );
            initial.truncate(opts.max_evaluations);
        }
        let Some(outcome) = self.pool.evaluate_batch(&initial, &self.stop) else {
            info!("🛑 Stop requested during initialization");
            return Ok(None);
        };

        let population = ParetoPopulation::new(outcome.candidates);
        let evaluations = population.len();
        let stats = Self::stats(&population, evaluations, outcome.invalid, 0, evaluations);
        let record = GenerationRecord {
            index: 0,
            survivors: population.members().to_vec(),
            offspring: Vec::new(),
            stats,
        };

        let mut progress = RunProgress {
            history: HistoryBuffer::new(),
            population,
            evaluations,
            rng,
            saved_len: 0,
        };
        if !self.archive(&mut progress, record, callback)? {
            self.stop.store(true, Ordering::Relaxed);
        }
        Ok(Some(progress))
    }

    /// Proposes `offspring_count` children from parents sampled out of
    /// `population`. Rejected proposals are kept so they get penalized.
    fn breed(&self, population: &ParetoPopulation, generation: usize, rng: &mut Rng) -> Vec<Candidate> {
        let opts = &self.options;
        let mut offspring: Vec<Candidate> = Vec::with_capacity(opts.offspring_count);
        if self.operator.children() == 0 {
            return offspring;
        }

        let parsed: Vec<Option<Genome>> = population.members().iter().map(Candidate::genome).collect();
        let pool: Vec<usize> = (0..parsed.len()).filter(|&i| parsed[i].is_some()).collect();
        let fallback = self.catalog.baseline();
        let no_metrics = BTreeMap::new();

        while offspring.len() < opts.offspring_count {
            let parents: Vec<Parent<'_>> = (0..self.operator.arity())
                .map(|_| {
                    if pool.is_empty() {
                        return Parent {
                            genome: fallback,
                            raw_metrics: &no_metrics,
                        };
                    }
                    let i = population.sample_parent(
                        &pool,
                        opts.parent_selection,
                        opts.tournament_size,
                        rng,
                    );
                    Parent {
                        genome: parsed[i].as_ref().unwrap_or(fallback),
                        raw_metrics: &population.members()[i].raw_metrics,
                    }
                })
                .collect();

            for result in self.operator.vary(&self.codec, &parents, rng) {
                let child = match result {
                    Ok(genome) => Candidate::from_genome(&genome, self.operator.origin(), generation),
                    Err(e) => {
                        warn!("⚠️ Rejected {} proposal: {}", self.operator.name(), e);
                        Candidate::proposed(e.payload(), Origin::Rejected, generation)
                    }
                };
                offspring.push(child);
            }
        }

        offspring.truncate(opts.offspring_count);
        offspring
    }

    fn stats(
        population: &ParetoPopulation,
        evaluated: usize,
        invalid: usize,
        repeated: usize,
        evaluations: usize,
    ) -> GenerationStats {
        let feasible: Vec<&Candidate> = population.members().iter().filter(|c| c.feasible).collect();
        GenerationStats {
            evaluated,
            invalid,
            repeated,
            feasible: feasible.len(),
            front_size: population.pareto_front().len(),
            best_score: feasible
                .iter()
                .map(|c| c.overall_score())
                .fold(-1.0, f64::max),
            evaluations,
        }
    }

    /// Appends `record`, checkpoints on cadence and reports progress.
    fn archive<CB: ProgressCallback>(
        &self,
        progress: &mut RunProgress,
        record: GenerationRecord,
        callback: &CB,
    ) -> ForgeResult<bool> {
        let s = &record.stats;
        info!(
            "🧬 Gen {:>3} | evaluated {:>3} | invalid {:>3} | repeated {:>3} | front {:>3} | best {:.4} | total {}",
            record.index, s.evaluated, s.invalid, s.repeated, s.front_size, s.best_score, s.evaluations
        );

        let index = record.index;
        progress.history.push(record);

        if index % self.options.checkpoint_every.max(1) == 0 {
            self.save(progress)?;
            progress.saved_len = progress.history.len();
        }

        let keep_going = match progress.history.last() {
            Some(last) => callback.on_generation(last, &progress.population),
            None => true,
        };
        Ok(keep_going)
    }

    fn save(&self, progress: &RunProgress) -> ForgeResult<()> {
        let Some(path) = self.options.checkpoint_path.as_ref() else {
            return Ok(());
        };
        let checkpoint = Checkpoint {
            format_version: CHECKPOINT_FORMAT_VERSION,
            run_id: self.options.run_id.clone(),
            objective_names: self
                .pool
                .evaluator()
                .objectives()
                .iter()
                .map(|o| o.name.clone())
                .collect(),
            rng_seed: progress.rng.get_seed(),
            evaluations: progress.evaluations,
            history: progress.history.clone(),
            population: progress.population.members().to_vec(),
        };
        checkpoint.save(path)
    }
}
