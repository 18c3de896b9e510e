pub mod evaluator;
pub mod process;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use strum::{Display, EnumString};

pub use self::evaluator::{BatchOutcome, EvaluationPool, FitnessEvaluator};
pub use self::process::ProcessEngine;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl RunOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricStatus {
    Success,
    SuccessNoData,
    Failed,
}

impl MetricStatus {
    /// Unknown status strings count as failure.
    pub fn parse_lenient(s: &str) -> Self {
        MetricStatus::from_str(s.trim()).unwrap_or(MetricStatus::Failed)
    }

    pub fn is_usable(self) -> bool {
        matches!(self, MetricStatus::Success | MetricStatus::SuccessNoData)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub status: MetricStatus,
    pub values: BTreeMap<String, f64>,
}

impl MetricsReport {
    pub fn failed() -> Self {
        Self {
            status: MetricStatus::Failed,
            values: BTreeMap::new(),
        }
    }

    pub fn success(values: BTreeMap<String, f64>) -> Self {
        Self {
            status: MetricStatus::Success,
            values,
        }
    }
}

/// The external analysis collaborator. One instance owns one mutable working
/// area; callers never share an instance between concurrent evaluations.
pub trait AnalysisEngine: Send {
    /// Writes every block into the engine's input surface.
    fn write(&mut self, blocks: &BTreeMap<String, String>) -> bool;

    /// Runs the analysis, giving up after `timeout`.
    fn run(&mut self, timeout: Duration) -> RunOutcome;

    fn read_metrics(&mut self) -> MetricsReport;
}
