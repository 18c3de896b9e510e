use crate::consts::CHECKPOINT_FORMAT_VERSION;
use crate::core_types::Candidate;
use crate::error::{ForgeError, ForgeResult};
use crate::util::atomic_write;
use itertools::Itertools;
use paretoforge_protocol::objective::ObjectiveSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Candidates sent to the analysis this generation.
    pub evaluated: usize,
    pub invalid: usize,
    pub repeated: usize,
    /// Feasible survivors.
    pub feasible: usize,
    pub front_size: usize,
    pub best_score: f64,
    /// Cumulative over the whole run.
    pub evaluations: usize,
}

/// One archived generation: its survivors and the batch evaluated to make them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub index: usize,
    pub survivors: Vec<Candidate>,
    #[serde(default)]
    pub offspring: Vec<Candidate>,
    pub stats: GenerationStats,
}

/// Append-only sequence of generations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryBuffer {
    generations: Vec<GenerationRecord>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GenerationRecord) {
        self.generations.push(record);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    pub fn generations(&self) -> &[GenerationRecord] {
        &self.generations
    }

    pub fn last(&self) -> Option<&GenerationRecord> {
        self.generations.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub format_version: u32,
    pub run_id: String,
    pub objective_names: Vec<String>,
    /// Position of the variation random stream.
    pub rng_seed: u64,
    pub evaluations: usize,
    pub history: HistoryBuffer,
    pub population: Vec<Candidate>,
}

impl Checkpoint {
    /// `<save_dir>/<objective names joined by '_'>_<suffix>.json`
    pub fn path_for(save_dir: &Path, objectives: &[ObjectiveSpec], suffix: &str) -> PathBuf {
        let stem = objectives.iter().map(|o| o.name.as_str()).join("_");
        save_dir.join(format!("{}_{}.json", stem, suffix))
    }

    pub fn save(&self, path: &Path) -> ForgeResult<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let body = serde_json::to_vec(self)?;
        atomic_write(path, body)?;
        info!(
            "💾 Checkpoint: {} generations -> {:?}",
            self.history.len(),
            path
        );
        Ok(())
    }

    /// Any read or parse failure is corruption: the caller must not fall back
    /// to a fresh run.
    pub fn load(path: &Path) -> ForgeResult<Self> {
        let body = fs::read(path)
            .map_err(|e| ForgeError::CheckpointCorruption(format!("{:?}: {}", path, e)))?;
        let checkpoint: Checkpoint = serde_json::from_slice(&body)
            .map_err(|e| ForgeError::CheckpointCorruption(format!("{:?}: {}", path, e)))?;

        if checkpoint.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(ForgeError::CheckpointCorruption(format!(
                "format version {} (expected {})",
                checkpoint.format_version, CHECKPOINT_FORMAT_VERSION
            )));
        }
        if checkpoint.history.is_empty() {
            return Err(ForgeError::CheckpointCorruption("empty history".into()));
        }
        Ok(checkpoint)
    }

    /// Refuses a checkpoint produced for another problem definition.
    pub fn verify(&self, run_id: &str, objectives: &[ObjectiveSpec]) -> ForgeResult<()> {
        if self.run_id != run_id {
            return Err(ForgeError::CheckpointCorruption(format!(
                "run id {} does not match the current configuration ({})",
                self.run_id, run_id
            )));
        }
        let names: Vec<&str> = objectives.iter().map(|o| o.name.as_str()).collect();
        if self.objective_names != names {
            return Err(ForgeError::CheckpointCorruption(format!(
                "objectives {:?} do not match {:?}",
                self.objective_names, names
            )));
        }
        Ok(())
    }
}
