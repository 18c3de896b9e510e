mod common;

use common::{ScriptedEngine, SurrogateEngine};
use paretoforge_core::consts::{
    REASON_INVALID_ENCODING, REASON_INVALID_STRUCTURE, REASON_METRIC_EXTRACTION,
    REASON_WRITE_FAILED,
};
use paretoforge_core::core_types::{Candidate, Genome, Origin};
use paretoforge_core::fitness::{AnalysisEngine, EvaluationPool, MetricStatus};
use paretoforge_core::objective::{PENALTY_SENTINEL_MAX, PENALTY_SENTINEL_MIN};
use rstest::rstest;
use std::sync::atomic::AtomicBool;

fn baseline_candidate() -> Candidate {
    Candidate::from_genome(&common::baseline(), Origin::Seed, 0)
}

#[test]
fn test_failed_analysis_is_penalized() {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::failing("solver diverged");

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());

    assert!(!out.feasible);
    assert_eq!(out.objectives, vec![1.0, 1.0, 1.0]);
    assert_eq!(out.raw_metrics["weight"], PENALTY_SENTINEL_MIN);
    assert_eq!(out.raw_metrics["uc"], PENALTY_SENTINEL_MIN);
    assert_eq!(out.raw_metrics["fatigue"], PENALTY_SENTINEL_MAX);
    assert_eq!(out.error_reason.as_deref(), Some("solver diverged"));
}

#[test]
fn test_feasible_candidate_is_normalized() {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::reporting(&[("weight", 3.0), ("uc", 0.7), ("fatigue", 300.0)]);

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());

    assert!(out.feasible);
    assert!(out.error_reason.is_none());
    assert_eq!(out.objectives, vec![0.5, 0.0, 0.0]);
    assert_eq!(out.raw_metrics["fatigue"], 300.0);
}

#[rstest]
#[case::unparsable("not json", REASON_INVALID_ENCODING)]
#[case::empty("{\"new_code_blocks\": {}}", REASON_INVALID_STRUCTURE)]
fn test_payload_failures(#[case] payload: &str, #[case] reason: &str) {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::reporting(&[("weight", 3.0), ("uc", 0.8), ("fatigue", 100.0)]);

    let candidate = Candidate::proposed(payload, Origin::Rejected, 1);
    let out = evaluator.evaluate(&mut engine, &candidate);
    assert!(!out.feasible);
    assert_eq!(out.error_reason.as_deref(), Some(reason));
}

#[test]
fn test_write_failure_is_penalized() {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::reporting(&[]);
    engine.write_ok = false;

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());
    assert_eq!(out.error_reason.as_deref(), Some(REASON_WRITE_FAILED));
}

#[rstest]
#[case::missing_metric(MetricStatus::Success, &[("weight", 3.0), ("uc", 0.8)])]
#[case::failed_status(MetricStatus::Failed, &[("weight", 3.0), ("uc", 0.8), ("fatigue", 1.0)])]
#[case::non_finite(MetricStatus::Success, &[("weight", f64::NAN), ("uc", 0.8), ("fatigue", 1.0)])]
fn test_metric_extraction_failures(#[case] status: MetricStatus, #[case] values: &[(&str, f64)]) {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::reporting(values);
    engine.report.status = status;

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());
    assert!(!out.feasible);
    assert_eq!(out.error_reason.as_deref(), Some(REASON_METRIC_EXTRACTION));
}

#[test]
fn test_success_without_data_is_usable() {
    let evaluator = common::evaluator();
    let mut engine = ScriptedEngine::reporting(&[("weight", 2.0), ("uc", 1.0), ("fatigue", 20.0)]);
    engine.report.status = MetricStatus::SuccessNoData;

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());
    assert!(out.feasible);
    assert_eq!(out.objectives, vec![0.0, 1.0, 1.0]);
}

#[test]
fn test_long_error_reason_is_truncated() {
    let evaluator = common::evaluator();
    let long = "x".repeat(1000);
    let mut engine = ScriptedEngine::failing(&long);

    let out = evaluator.evaluate(&mut engine, &baseline_candidate());
    assert!(out.error_reason.unwrap().chars().count() <= 200);
}

#[test]
fn test_batch_keeps_input_order() {
    let pool = common::surrogate_pool(3);
    let mutation = common::seed_mutation();
    let mut rng = fastrand::Rng::with_seed(9);

    let mut batch: Vec<Candidate> = (0..8)
        .map(|_| {
            let g = mutation.mutate(&common::baseline(), &mut rng).unwrap();
            Candidate::from_genome(&g, Origin::Mutation, 1)
        })
        .collect();
    batch.push(Candidate::proposed("garbage", Origin::Rejected, 1));

    let outcome = pool.evaluate_batch(&batch, &AtomicBool::new(false)).unwrap();
    assert_eq!(outcome.candidates.len(), batch.len());
    assert_eq!(outcome.invalid, 1);
    for (before, after) in batch.iter().zip(&outcome.candidates) {
        assert_eq!(before.payload, after.payload);
    }
    assert!(outcome.candidates[..8].iter().all(|c| c.feasible));
}

#[test]
fn test_raised_stop_flag_discards_batch() {
    let pool = common::surrogate_pool(2);
    let batch = vec![baseline_candidate()];
    assert!(pool.evaluate_batch(&batch, &AtomicBool::new(true)).is_none());
}

#[test]
fn test_surrogate_metrics_are_in_objective_ranges() {
    let mut engine = SurrogateEngine::new();
    let genome: Genome = common::baseline();
    assert!(engine.write(genome.blocks()));
    let report = engine.read_metrics();
    let specs = common::objectives();
    for spec in &specs {
        let v = report.values[&spec.name];
        assert!(v > spec.lo && v < spec.hi, "{} = {}", spec.name, v);
    }
    assert!(EvaluationPool::new(common::evaluator(), Vec::new()).is_err());
}
