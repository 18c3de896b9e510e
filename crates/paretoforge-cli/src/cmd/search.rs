use crate::cmd::{load_genome, load_schema};
use crate::reports;
use clap::{ArgMatches, Args};
use paretoforge_core::codec::GenomeCodec;
use paretoforge_core::config::Config;
use paretoforge_core::error::ForgeResult;
use paretoforge_core::fitness::{EvaluationPool, FitnessEvaluator, ProcessEngine};
use paretoforge_core::history::{Checkpoint, GenerationRecord};
use paretoforge_core::job::RunIdentifier;
use paretoforge_core::optimizer::{
    build_operator, seed_mutation, OptimizationLoop, OptimizationOptions, ProgressCallback,
};
use paretoforge_core::pareto::ParetoPopulation;
use paretoforge_core::seeds::SeedCatalog;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub config: Config,

    /// JSON config file. Flags typed on the command line take precedence.
    #[arg(long = "config")]
    pub config_path: Option<String>,

    /// Directory of seed files (`*.json`, full or partial genomes)
    #[arg(long)]
    pub seeds: Option<String>,

    /// Baseline genome that partial seeds are completed from
    #[arg(long)]
    pub baseline: Option<String>,

    /// Continue from the checkpoint of this configuration if one exists
    #[arg(long, default_value_t = false)]
    pub resume: bool,
}

struct CliLogger {
    names: Vec<String>,
}

impl ProgressCallback for CliLogger {
    fn on_generation(&self, record: &GenerationRecord, population: &ParetoPopulation) -> bool {
        for (i, name) in self.names.iter().enumerate() {
            let best = population
                .pareto_front()
                .iter()
                .filter_map(|c| c.objectives.get(i).map(|v| (*v, c.raw_metrics.get(name))))
                .min_by(|a, b| a.0.total_cmp(&b.0));
            if let Some((norm, Some(raw))) = best {
                debug!("Gen {} | best {} = {:.4} (norm {:.3})", record.index, name, raw, norm);
            }
        }
        true
    }
}

fn resolve_config(args: &SearchArgs, matches: &ArgMatches) -> ForgeResult<Config> {
    match &args.config_path {
        Some(path) => {
            info!("⚙️  Loading config: {}", path);
            let mut config = Config::load_from_file(path)?;
            config.merge_from_cli(&args.config, matches);
            Ok(config)
        }
        None => Ok(args.config.clone()),
    }
}

fn load_catalog(args: &SearchArgs, codec: &GenomeCodec) -> ForgeResult<SeedCatalog> {
    let baseline = args.baseline.as_deref().map(load_genome).transpose()?;
    match (&args.seeds, baseline) {
        (Some(dir), baseline) => SeedCatalog::load_dir(dir, codec, baseline),
        (None, Some(baseline)) => SeedCatalog::from_genomes(codec, baseline, Vec::new()),
        (None, None) => SeedCatalog::builtin(codec),
    }
}

pub fn run(args: &SearchArgs, matches: &ArgMatches, schema_path: Option<&str>) -> ForgeResult<()> {
    let config = resolve_config(args, matches)?;
    debug!("Effective config: {}", serde_json::to_string(&config)?);

    let objectives = config.objectives.get_objectives()?;
    let names: Vec<String> = objectives.iter().map(|o| o.name.clone()).collect();
    let schema = load_schema(schema_path)?;
    schema.validate()?;
    let run_id = RunIdentifier::from_parts(&schema, &objectives, &config.search)?;
    let codec = GenomeCodec::new(Arc::new(schema));

    let catalog = load_catalog(args, &codec)?;
    info!("🌱 Seed catalog: {} genomes", catalog.len());

    let checkpoint_path = Checkpoint::path_for(
        Path::new(&config.search.save_dir),
        &objectives,
        &config.search.save_suffix,
    );
    let mut options = OptimizationOptions::from(&config);
    options.checkpoint_path = Some(checkpoint_path.clone());
    options.run_id = run_id.hash.clone();
    options.resume = args.resume;
    info!("🆔 Run {} -> {:?}", run_id.short(), checkpoint_path);

    let engines = ProcessEngine::create_slots(&config.analysis, config.search.workers)?;
    let evaluator = FitnessEvaluator::new(
        codec.clone(),
        objectives.clone(),
        Duration::from_secs(config.analysis.timeout_secs),
    );
    let pool = EvaluationPool::new(evaluator, engines)?;
    info!("🔧 {} analysis slots under {}", pool.workers(), config.analysis.scratch_root);

    let operator = build_operator(&config.variation, &codec, &objectives);
    info!("🧪 Variation: {} (arity {})", operator.name(), operator.arity());

    let mut optimizer = OptimizationLoop::new(
        options,
        codec.clone(),
        operator,
        seed_mutation(&config.variation, &codec),
        pool,
        catalog,
    );
    let result = optimizer.run(CliLogger {
        names: names.clone(),
    })?;

    info!(
        "\n=== 🏁 {} after {} generations, {} evaluations ===",
        result.state,
        result.history.len(),
        result.evaluations
    );
    reports::print_front(&names, &result.population.pareto_front());
    Ok(())
}
