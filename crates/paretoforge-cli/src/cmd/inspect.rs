use crate::reports;
use clap::Args;
use paretoforge_core::error::ForgeResult;
use paretoforge_core::history::Checkpoint;
use paretoforge_core::pareto::ParetoPopulation;
use std::path::Path;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Checkpoint file written by `search`
    pub checkpoint: String,
}

pub fn run(args: &InspectArgs) -> ForgeResult<()> {
    let checkpoint = Checkpoint::load(Path::new(&args.checkpoint))?;
    info!(
        "📂 Run {} | objectives {:?} | {} evaluations",
        checkpoint.run_id, checkpoint.objective_names, checkpoint.evaluations
    );

    reports::print_generations(&checkpoint.history);
    reports::print_best_per_objective(&checkpoint.objective_names, &checkpoint.population);

    let population = ParetoPopulation::new(checkpoint.population);
    reports::print_front(&checkpoint.objective_names, &population.pareto_front());
    Ok(())
}
