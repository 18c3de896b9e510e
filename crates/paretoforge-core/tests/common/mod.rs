#![allow(dead_code)] // Each test binary uses a different subset of the helpers

use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::core_types::{Candidate, Genome, Origin};
use paretoforge_core::fitness::{
    AnalysisEngine, EvaluationPool, FitnessEvaluator, MetricsReport, RunOutcome,
};
use paretoforge_core::objective::ObjectiveSpec;
use paretoforge_core::optimizer::{
    GeneticVariation, Mutation, OptimizationLoop, OptimizationOptions,
};
use paretoforge_core::schema::{FieldSpec, Justify, LayoutRule, RecordLayout, Schema};
use paretoforge_core::seeds::SeedCatalog;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const OBJECTIVES: &str = "weight:minimize:2.0:4.0,uc:minimize:0.7:1.0,fatigue:maximize:20:300";

pub fn codec() -> GenomeCodec {
    GenomeCodec::new(Arc::new(Schema::default()))
}

pub fn objectives() -> Vec<ObjectiveSpec> {
    ObjectiveSpec::parse_list(OBJECTIVES).unwrap()
}

pub fn evaluator() -> FitnessEvaluator {
    FitnessEvaluator::new(codec(), objectives(), Duration::from_secs(5))
}

/// Two-field layout used by the record scenarios: `KEY  10.000 0.500tail`.
pub fn key_schema() -> Schema {
    let field = |name: &str, start, width, min, max| FieldSpec {
        name: name.into(),
        start,
        width,
        precision: 3,
        justify: Justify::Right,
        min,
        max,
    };
    Schema {
        layouts: vec![RecordLayout {
            keyword: "KEY".into(),
            rule: LayoutRule::Columns {
                fields: vec![field("a", 5, 6, 10.0, 48.0), field("b", 12, 5, 0.1, 2.5)],
            },
        }],
        blocks: vec!["KEY".into()],
    }
}

/// A candidate with a fixed objective vector, distinct per vector.
pub fn scored(objectives: &[f64], feasible: bool) -> Candidate {
    let mut c = Candidate::proposed(format!("{:?}/{}", objectives, feasible), Origin::Seed, 0);
    c.objectives = objectives.to_vec();
    c.feasible = feasible;
    c
}

/// Closed-form stand-in for the structural analysis. Heavier sections lower
/// the utilisation and raise fatigue life, so the objectives conflict.
pub struct SurrogateEngine {
    codec: GenomeCodec,
    blocks: BTreeMap<String, String>,
    pub runs: Arc<AtomicUsize>,
}

impl SurrogateEngine {
    pub fn new() -> Self {
        Self {
            codec: codec(),
            blocks: BTreeMap::new(),
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn metrics(&self) -> Option<BTreeMap<String, f64>> {
        let mut area = 0.0;
        let mut thickness = 0.0;
        for record in self.blocks.values() {
            let values = self.codec.decode_record(record).ok()??;
            match values.as_slice() {
                [od, wt] => area += od * wt,
                [t] => thickness = *t,
                _ => return None,
            }
        }
        Some(BTreeMap::from([
            ("weight".to_string(), area / 200.0 + thickness),
            ("uc".to_string(), 500.0 / area),
            ("fatigue".to_string(), area * thickness),
        ]))
    }
}

impl AnalysisEngine for SurrogateEngine {
    fn write(&mut self, blocks: &BTreeMap<String, String>) -> bool {
        self.blocks = blocks.clone();
        true
    }

    fn run(&mut self, _timeout: Duration) -> RunOutcome {
        self.runs.fetch_add(1, Ordering::SeqCst);
        RunOutcome::ok()
    }

    fn read_metrics(&mut self) -> MetricsReport {
        match self.metrics() {
            Some(values) => MetricsReport::success(values),
            None => MetricsReport::failed(),
        }
    }
}

/// Returns the same canned outcome for every evaluation.
pub struct ScriptedEngine {
    pub write_ok: bool,
    pub outcome: RunOutcome,
    pub report: MetricsReport,
}

impl ScriptedEngine {
    pub fn failing(error: &str) -> Self {
        Self {
            write_ok: true,
            outcome: RunOutcome::failed(error),
            report: MetricsReport::failed(),
        }
    }

    pub fn reporting(values: &[(&str, f64)]) -> Self {
        Self {
            write_ok: true,
            outcome: RunOutcome::ok(),
            report: MetricsReport::success(
                values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            ),
        }
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn write(&mut self, _blocks: &BTreeMap<String, String>) -> bool {
        self.write_ok
    }

    fn run(&mut self, _timeout: Duration) -> RunOutcome {
        self.outcome.clone()
    }

    fn read_metrics(&mut self) -> MetricsReport {
        self.report.clone()
    }
}

pub fn surrogate_pool(workers: usize) -> EvaluationPool {
    let engines: Vec<Box<dyn AnalysisEngine>> = (0..workers)
        .map(|_| Box::new(SurrogateEngine::new()) as Box<dyn AnalysisEngine>)
        .collect();
    EvaluationPool::new(evaluator(), engines).unwrap()
}

pub fn seed_mutation() -> Mutation {
    Mutation::new(codec(), 0.6, 1.4, 3)
}

/// Genetic loop over the built-in baseline, evaluated by the surrogate.
pub fn genetic_loop(options: OptimizationOptions, workers: usize) -> OptimizationLoop {
    genetic_loop_with_pool(options, surrogate_pool(workers))
}

pub fn genetic_loop_with_pool(options: OptimizationOptions, pool: EvaluationPool) -> OptimizationLoop {
    let codec = codec();
    let operator = GeneticVariation::new(Mutation::new(codec.clone(), 0.6, 1.4, 0), 0.3);
    OptimizationLoop::new(
        options,
        codec.clone(),
        Box::new(operator),
        seed_mutation(),
        pool,
        SeedCatalog::builtin(&codec).unwrap(),
    )
}

pub fn baseline() -> Genome {
    paretoforge_core::seeds::builtin_baseline()
}
