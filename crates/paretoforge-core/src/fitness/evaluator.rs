use crate::codec::GenomeCodec;
use crate::consts::{
    ERROR_REASON_LIMIT, REASON_ANALYSIS_FAILED, REASON_INVALID_ENCODING,
    REASON_INVALID_STRUCTURE, REASON_METRIC_EXTRACTION, REASON_WRITE_FAILED,
};
use crate::core_types::{unwrap_candidate, Candidate, Genome};
use crate::error::{ForgeError, ForgeResult};
use crate::fitness::AnalysisEngine;
use crate::util::truncate_chars;
use paretoforge_protocol::objective::{ObjectiveSpec, WORST_NORMALIZED};
use paretoforge_protocol::protocol::GenomePayload;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Turns a candidate's payload into a feasibility flag and objective vector.
/// Every failure is absorbed into the penalty path.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    codec: GenomeCodec,
    objectives: Vec<ObjectiveSpec>,
    timeout: Duration,
}

impl FitnessEvaluator {
    pub fn new(codec: GenomeCodec, objectives: Vec<ObjectiveSpec>, timeout: Duration) -> Self {
        Self {
            codec,
            objectives,
            timeout,
        }
    }

    pub fn objectives(&self) -> &[ObjectiveSpec] {
        &self.objectives
    }

    pub fn evaluate(&self, engine: &mut dyn AnalysisEngine, candidate: &Candidate) -> Candidate {
        let mut out = candidate.clone();
        match self.try_evaluate(engine, &candidate.payload) {
            Ok((raw, normalized)) => {
                out.feasible = true;
                out.raw_metrics = raw;
                out.objectives = normalized;
                out.error_reason = None;
            }
            Err(reason) => self.penalize(&mut out, reason),
        }
        out
    }

    fn try_evaluate(
        &self,
        engine: &mut dyn AnalysisEngine,
        payload: &str,
    ) -> Result<(BTreeMap<String, f64>, Vec<f64>), String> {
        // 1. Parse
        let body = unwrap_candidate(payload).unwrap_or(payload).trim();
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|_| REASON_INVALID_ENCODING.to_string())?;

        // 2. Shape: well-formed JSON without a block map is a structure fault
        let genome = serde_json::from_value::<GenomePayload>(value)
            .map(|p| Genome::from_blocks(p.new_code_blocks))
            .map_err(|_| REASON_INVALID_STRUCTURE.to_string())?;
        if let Err(e) = self.codec.validate_genome(&genome) {
            debug!("structure check failed: {}", e);
            return Err(REASON_INVALID_STRUCTURE.to_string());
        }

        // 3. Write
        if !engine.write(genome.blocks()) {
            return Err(REASON_WRITE_FAILED.to_string());
        }

        // 4. Run
        let outcome = engine.run(self.timeout);
        if !outcome.success {
            let msg = outcome.error.unwrap_or_else(|| REASON_ANALYSIS_FAILED.to_string());
            return Err(truncate_chars(&msg, ERROR_REASON_LIMIT));
        }

        // 5. Read back
        let report = engine.read_metrics();
        if !report.status.is_usable() {
            return Err(REASON_METRIC_EXTRACTION.to_string());
        }
        let mut raw = BTreeMap::new();
        for spec in &self.objectives {
            match report.values.get(&spec.name) {
                Some(v) if v.is_finite() => {
                    raw.insert(spec.name.clone(), *v);
                }
                _ => return Err(REASON_METRIC_EXTRACTION.to_string()),
            }
        }

        // 6. Normalize
        let normalized = self
            .objectives
            .iter()
            .map(|spec| spec.normalize(raw[&spec.name]))
            .collect();

        Ok((raw, normalized))
    }

    /// Marks `candidate` infeasible with sentinel raw metrics and the worst
    /// normalized value on every objective.
    pub fn penalize(&self, candidate: &mut Candidate, reason: String) {
        warn!("⚠️ Candidate penalized: {}", reason);
        candidate.feasible = false;
        candidate.raw_metrics = self
            .objectives
            .iter()
            .map(|spec| (spec.name.clone(), spec.penalty_value()))
            .collect();
        candidate.objectives = vec![WORST_NORMALIZED; self.objectives.len()];
        candidate.error_reason = Some(reason);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Same order as the input batch.
    pub candidates: Vec<Candidate>,
    pub invalid: usize,
}

/// Evaluates batches in parallel, one analysis slot per worker thread.
pub struct EvaluationPool {
    evaluator: FitnessEvaluator,
    slots: Vec<Mutex<Box<dyn AnalysisEngine>>>,
    pool: rayon::ThreadPool,
}

impl EvaluationPool {
    /// One worker thread per engine.
    pub fn new(evaluator: FitnessEvaluator, engines: Vec<Box<dyn AnalysisEngine>>) -> ForgeResult<Self> {
        if engines.is_empty() {
            return Err(ForgeError::Config("at least one analysis slot is required".into()));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(engines.len())
            .thread_name(|i| format!("analysis-slot-{}", i))
            .build()
            .map_err(|e| ForgeError::Config(format!("failed to build worker pool: {}", e)))?;

        Ok(Self {
            evaluator,
            slots: engines.into_iter().map(Mutex::new).collect(),
            pool,
        })
    }

    pub fn workers(&self) -> usize {
        self.slots.len()
    }

    pub fn evaluator(&self) -> &FitnessEvaluator {
        &self.evaluator
    }

    /// `None` when `stop` was raised before the batch finished; partial
    /// results are discarded.
    pub fn evaluate_batch(&self, batch: &[Candidate], stop: &AtomicBool) -> Option<BatchOutcome> {
        let results: Vec<Option<Candidate>> = self.pool.install(|| {
            batch
                .par_iter()
                .map(|candidate| {
                    if stop.load(Ordering::Relaxed) {
                        return None;
                    }
                    let slot = rayon::current_thread_index().unwrap_or(0) % self.slots.len();
                    // Recover slots poisoned by a panicking evaluation
                    let mut engine = self.slots[slot]
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner);
                    Some(self.evaluator.evaluate(&mut **engine, candidate))
                })
                .collect()
        });

        if stop.load(Ordering::Relaxed) {
            return None;
        }
        let candidates = results.into_iter().collect::<Option<Vec<Candidate>>>()?;
        let invalid = candidates.iter().filter(|c| !c.feasible).count();
        Some(BatchOutcome {
            candidates,
            invalid,
        })
    }
}
