use crate::objective::ObjectiveSpec;
use crate::protocol::Instruction;
use crate::ConfigError;
use clap::{parser::ValueSource, ArgMatches, Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[command(flatten)]
    #[serde(default)]
    pub search: SearchParams,
    #[command(flatten)]
    #[serde(default)]
    pub variation: VariationParams,
    #[command(flatten)]
    #[serde(default)]
    pub analysis: AnalysisParams,
    #[command(flatten)]
    #[serde(default)]
    pub objectives: ObjectiveDefinitions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParentSelection {
    Uniform,
    Tournament,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Block-wise crossover followed by field mutation.
    Genetic,
    /// Proposals from an external generative command.
    Generative,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    #[arg(long, default_value_t = 20)]
    pub pop_size: usize,
    #[arg(long, default_value_t = 20)]
    pub offspring_count: usize,
    #[arg(long, default_value_t = 50)]
    pub max_generations: usize,
    /// 0 disables the evaluation budget.
    #[arg(long, default_value_t = 0)]
    pub max_evaluations: usize,
    #[arg(long, default_value_t = 1)]
    pub workers: usize,
    #[arg(long, default_value_t = 42)]
    pub rng_seed: u64,
    #[arg(long, value_enum, default_value_t = ParentSelection::Tournament)]
    pub parent_selection: ParentSelection,
    #[arg(long, default_value_t = 2)]
    pub tournament_size: usize,

    // === PERSISTENCE ===
    #[arg(long, default_value = "moo_results")]
    pub save_dir: String,
    #[arg(long, default_value = "run")]
    pub save_suffix: String,
    #[arg(long, default_value_t = 1)]
    pub checkpoint_every: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            pop_size: 20,
            offspring_count: 20,
            max_generations: 50,
            max_evaluations: 0,
            workers: 1,
            rng_seed: 42,
            parent_selection: ParentSelection::Tournament,
            tournament_size: 2,
            save_dir: "moo_results".to_string(),
            save_suffix: "run".to_string(),
            checkpoint_every: 1,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VariationParams {
    #[arg(long, value_enum, default_value_t = Strategy::Genetic)]
    pub strategy: Strategy,
    #[arg(long, default_value_t = 0.3)]
    pub mutation_prob: f64,
    #[arg(long, default_value_t = 0.6)]
    pub mutation_factor_min: f64,
    #[arg(long, default_value_t = 1.4)]
    pub mutation_factor_max: f64,
    /// Upper bound on blocks touched by one mutation. 0 means every block.
    #[arg(long, default_value_t = 0)]
    pub mutation_max_blocks: usize,
    #[arg(long, default_value_t = 3)]
    pub seed_mutation_max_blocks: usize,

    // Generative operator: command receiving the request JSON on stdin
    #[arg(long, default_value = "")]
    pub generative_command: String,
    #[arg(long, default_value_t = 120)]
    pub generative_timeout_secs: u64,
    #[arg(long, value_enum, default_value_t = Instruction::Crossover)]
    pub generative_instruction: Instruction,
}

impl Default for VariationParams {
    fn default() -> Self {
        Self {
            strategy: Strategy::Genetic,
            mutation_prob: 0.3,
            mutation_factor_min: 0.6,
            mutation_factor_max: 1.4,
            mutation_max_blocks: 0,
            seed_mutation_max_blocks: 3,
            generative_command: String::new(),
            generative_timeout_secs: 120,
            generative_instruction: Instruction::Crossover,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Template project copied into one scratch directory per worker.
    #[arg(long, default_value = "project")]
    pub project_dir: String,
    #[arg(long, default_value = "sacinp.model")]
    pub input_file: String,
    #[arg(long, default_value = "")]
    pub analysis_command: String,
    #[arg(long, default_value = "metrics.json")]
    pub metrics_file: String,
    #[arg(long, default_value = ".scratch")]
    pub scratch_root: String,
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            project_dir: "project".to_string(),
            input_file: "sacinp.model".to_string(),
            analysis_command: String::new(),
            metrics_file: "metrics.json".to_string(),
            scratch_root: ".scratch".to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveDefinitions {
    /// name:direction:lo:hi, comma separated.
    #[arg(
        long,
        default_value = "weight:minimize:2.0:4.0,uc:minimize:0.7:1.0,fatigue:maximize:20:300"
    )]
    pub objectives: String,
}

impl Default for ObjectiveDefinitions {
    fn default() -> Self {
        Self {
            objectives: "weight:minimize:2.0:4.0,uc:minimize:0.7:1.0,fatigue:maximize:20:300"
                .to_string(),
        }
    }
}

impl ObjectiveDefinitions {
    pub fn get_objectives(&self) -> Result<Vec<ObjectiveSpec>, ConfigError> {
        ObjectiveSpec::parse_list(&self.objectives)
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Copies into `self` only the values the user actually typed on the
    /// command line, so file values survive clap defaults.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($section:ident . $field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$section.$field = cli.$section.$field.clone();
                }
            };
        }

        update_if_present!(search.pop_size);
        update_if_present!(search.offspring_count);
        update_if_present!(search.max_generations);
        update_if_present!(search.max_evaluations);
        update_if_present!(search.workers);
        update_if_present!(search.rng_seed);
        update_if_present!(search.parent_selection);
        update_if_present!(search.tournament_size);
        update_if_present!(search.save_dir);
        update_if_present!(search.save_suffix);
        update_if_present!(search.checkpoint_every);

        update_if_present!(variation.strategy);
        update_if_present!(variation.mutation_prob);
        update_if_present!(variation.mutation_factor_min);
        update_if_present!(variation.mutation_factor_max);
        update_if_present!(variation.mutation_max_blocks);
        update_if_present!(variation.seed_mutation_max_blocks);
        update_if_present!(variation.generative_command);
        update_if_present!(variation.generative_timeout_secs);
        update_if_present!(variation.generative_instruction);

        update_if_present!(analysis.project_dir);
        update_if_present!(analysis.input_file);
        update_if_present!(analysis.analysis_command);
        update_if_present!(analysis.metrics_file);
        update_if_present!(analysis.scratch_root);
        update_if_present!(analysis.timeout_secs);

        update_if_present!(objectives.objectives);
    }
}
