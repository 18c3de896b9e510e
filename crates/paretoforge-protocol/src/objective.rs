use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};

/// Raw metric recorded for a penalized candidate on a `minimize` objective.
/// Far outside any physical range the analysis can report.
pub const PENALTY_SENTINEL_MIN: f64 = 1.0e12;

/// Raw metric recorded for a penalized candidate on a `maximize` objective.
pub const PENALTY_SENTINEL_MAX: f64 = -1.0e12;

/// Normalized value of every objective on the penalty path.
pub const WORST_NORMALIZED: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    #[strum(to_string = "minimize", serialize = "min")]
    Minimize,
    #[strum(to_string = "maximize", serialize = "max")]
    Maximize,
}

impl Direction {
    #[inline(always)]
    pub fn penalty_value(self) -> f64 {
        match self {
            Direction::Minimize => PENALTY_SENTINEL_MIN,
            Direction::Maximize => PENALTY_SENTINEL_MAX,
        }
    }
}

/// One optimization target: which raw metric, which way is better, and the
/// range used to map it into `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveSpec {
    pub name: String,
    pub direction: Direction,
    pub lo: f64,
    pub hi: f64,
}

impl ObjectiveSpec {
    pub fn new(name: &str, direction: Direction, lo: f64, hi: f64) -> Self {
        Self {
            name: name.to_string(),
            direction,
            lo,
            hi,
        }
    }

    /// Clips `raw` to `[lo, hi]`, maps it linearly into `[0, 1]` and inverts
    /// `maximize` objectives so that lower is better for every objective.
    /// A degenerate range maps everything to `0.0` in either direction.
    pub fn normalize(&self, raw: f64) -> f64 {
        let span = self.hi - self.lo;
        if span.abs() <= f64::EPSILON {
            return 0.0;
        }
        let scaled = (raw.clamp(self.lo, self.hi) - self.lo) / span;

        match self.direction {
            Direction::Minimize => scaled,
            Direction::Maximize => 1.0 - scaled,
        }
    }

    #[inline(always)]
    pub fn penalty_value(&self) -> f64 {
        self.direction.penalty_value()
    }

    /// Parses the compact `name:direction:lo:hi,...` form used on the command line.
    pub fn parse_list(input: &str) -> Result<Vec<ObjectiveSpec>, ConfigError> {
        let mut specs: Vec<ObjectiveSpec> = Vec::new();

        for entry in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let spec: ObjectiveSpec = entry.parse()?;
            if specs.iter().any(|s| s.name == spec.name) {
                return Err(ConfigError::Objective {
                    entry: entry.to_string(),
                    reason: "duplicate objective name".into(),
                });
            }
            specs.push(spec);
        }

        if specs.is_empty() {
            return Err(ConfigError::Objective {
                entry: input.to_string(),
                reason: "at least one objective is required".into(),
            });
        }

        Ok(specs)
    }
}

impl FromStr for ObjectiveSpec {
    type Err = ConfigError;

    fn from_str(entry: &str) -> Result<Self, Self::Err> {
        let bad = |reason: &str| ConfigError::Objective {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(bad("expected name:direction:lo:hi"));
        }
        if parts[0].is_empty() {
            return Err(bad("empty name"));
        }

        let direction = Direction::from_str(parts[1]).map_err(|_| bad("unknown direction"))?;
        let lo: f64 = parts[2].parse().map_err(|_| bad("lo is not a number"))?;
        let hi: f64 = parts[3].parse().map_err(|_| bad("hi is not a number"))?;

        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(bad("normalization range must be finite with lo <= hi"));
        }

        Ok(ObjectiveSpec::new(parts[0], direction, lo, hi))
    }
}
