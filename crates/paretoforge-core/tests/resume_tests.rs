mod common;

use common::SurrogateEngine;
use paretoforge_core::error::ForgeError;
use paretoforge_core::fitness::{AnalysisEngine, EvaluationPool, MetricsReport, RunOutcome};
use paretoforge_core::history::Checkpoint;
use paretoforge_core::optimizer::{LoopState, NoProgress, OptimizationOptions};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn options(path: &Path, generations: usize, resume: bool) -> OptimizationOptions {
    OptimizationOptions::builder()
        .pop_size(6)
        .offspring_count(6)
        .max_generations(generations)
        .rng_seed(7)
        .checkpoint_path(path.to_path_buf())
        .resume(resume)
        .run_id("resume-test")
        .build()
}

#[test]
fn test_resume_with_no_new_generations_is_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("weight_uc_fatigue_run.json");

    let first = common::genetic_loop(options(&path, 3, false), 2)
        .run(NoProgress)
        .unwrap();
    assert_eq!(first.state, LoopState::Terminated);
    assert_eq!(first.history.len(), 4);
    let saved = fs::read(&path).unwrap();

    let mut resumed_loop = common::genetic_loop(options(&path, 3, true), 2);
    let resumed = resumed_loop.run(NoProgress).unwrap();

    assert_eq!(resumed.history, first.history);
    assert_eq!(resumed.population.members(), first.population.members());
    assert_eq!(resumed.evaluations, first.evaluations);
    assert_eq!(fs::read(&path).unwrap(), saved);
}

#[test]
fn test_resumed_run_continues_like_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let straight_path = dir.path().join("straight.json");
    let split_path = dir.path().join("split.json");

    let straight = common::genetic_loop(options(&straight_path, 4, false), 1)
        .run(NoProgress)
        .unwrap();

    common::genetic_loop(options(&split_path, 2, false), 3)
        .run(NoProgress)
        .unwrap();
    let split = common::genetic_loop(options(&split_path, 4, true), 3)
        .run(NoProgress)
        .unwrap();

    assert_eq!(split.history, straight.history);
    assert_eq!(split.evaluations, straight.evaluations);
}

#[test]
fn test_checkpoint_of_other_configuration_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cp.json");
    common::genetic_loop(options(&path, 1, false), 1)
        .run(NoProgress)
        .unwrap();

    let mut opts = options(&path, 2, true);
    opts.run_id = "another-problem".into();
    let mut other = common::genetic_loop(opts, 1);

    let err = other.run(NoProgress).unwrap_err();
    assert!(matches!(err, ForgeError::CheckpointCorruption(_)));
    assert_eq!(other.state(), LoopState::Failed);
}

#[test]
fn test_corrupted_checkpoint_aborts_instead_of_restarting() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cp.json");
    fs::write(&path, "{\"format_version\": 1, \"history\": [").unwrap();

    let mut optimizer = common::genetic_loop(options(&path, 2, true), 1);
    assert!(matches!(
        optimizer.run(NoProgress),
        Err(ForgeError::CheckpointCorruption(_))
    ));
    assert_eq!(optimizer.state(), LoopState::Failed);
    assert!(fs::read_to_string(&path).unwrap().ends_with('['));
}

#[test]
fn test_missing_checkpoint_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("cp.json");

    let result = common::genetic_loop(options(&path, 1, true), 1)
        .run(NoProgress)
        .unwrap();
    assert_eq!(result.history.len(), 2);

    let checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(checkpoint.history, result.history);
    assert_eq!(checkpoint.run_id, "resume-test");
    assert_eq!(checkpoint.objective_names, vec!["weight", "uc", "fatigue"]);
}

/// Surrogate that raises `stop` while running its `at`-th analysis.
struct StopDuringRun {
    inner: SurrogateEngine,
    runs: Arc<AtomicUsize>,
    at: usize,
    stop: Arc<AtomicBool>,
}

impl AnalysisEngine for StopDuringRun {
    fn write(&mut self, blocks: &BTreeMap<String, String>) -> bool {
        self.inner.write(blocks)
    }

    fn run(&mut self, timeout: Duration) -> RunOutcome {
        if self.runs.fetch_add(1, Ordering::SeqCst) + 1 == self.at {
            self.stop.store(true, Ordering::SeqCst);
        }
        self.inner.run(timeout)
    }

    fn read_metrics(&mut self) -> MetricsReport {
        self.inner.read_metrics()
    }
}

#[test]
fn test_stop_between_checkpoints_resumes_like_uninterrupted_run() {
    let dir = tempfile::tempdir().unwrap();
    let sparse = |path: &Path, generations: usize, resume: bool| {
        let mut opts = options(path, generations, resume);
        opts.checkpoint_every = 3;
        opts
    };

    let straight = common::genetic_loop(sparse(&dir.path().join("straight.json"), 4, false), 1)
        .run(NoProgress)
        .unwrap();
    // First analysis of generation 3; generations 1 and 2 are not yet on disk
    let at = straight.history.generations()[2].stats.evaluations + 1;

    let path = dir.path().join("split.json");
    let stop = Arc::new(AtomicBool::new(false));
    let engine = StopDuringRun {
        inner: SurrogateEngine::new(),
        runs: Arc::new(AtomicUsize::new(0)),
        at,
        stop: stop.clone(),
    };
    let engines: Vec<Box<dyn AnalysisEngine>> = vec![Box::new(engine)];
    let pool = EvaluationPool::new(common::evaluator(), engines).unwrap();
    let interrupted = common::genetic_loop_with_pool(sparse(&path, 4, false), pool)
        .with_stop(stop)
        .run(NoProgress)
        .unwrap();
    assert_eq!(interrupted.state, LoopState::Terminated);
    assert_eq!(interrupted.history.len(), 3);
    assert_eq!(Checkpoint::load(&path).unwrap().history.len(), 3);

    let resumed = common::genetic_loop(sparse(&path, 4, true), 1)
        .run(NoProgress)
        .unwrap();
    assert_eq!(resumed.history, straight.history);
    assert_eq!(resumed.evaluations, straight.evaluations);
}
