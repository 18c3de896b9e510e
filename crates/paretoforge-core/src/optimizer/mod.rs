pub mod crossover;
pub mod generative;
pub mod initialization;
pub mod mutation;
pub mod runner;
pub mod variation;

pub use self::crossover::Crossover;
pub use self::generative::{CommandBackend, Generative, GenerativeBackend};
pub use self::mutation::Mutation;
pub use self::runner::{
    LoopState, NoProgress, OptimizationLoop, OptimizationOptions, OptimizationResult,
    ProgressCallback,
};
pub use self::variation::{GeneticVariation, Parent, VariationOperator};

use crate::codec::GenomeCodec;
use crate::config::{Strategy, VariationParams};
use paretoforge_protocol::objective::ObjectiveSpec;
use std::time::Duration;

/// Mutation used for the main loop (`mutation_max_blocks`).
pub fn loop_mutation(params: &VariationParams, codec: &GenomeCodec) -> Mutation {
    Mutation::new(
        codec.clone(),
        params.mutation_factor_min,
        params.mutation_factor_max,
        params.mutation_max_blocks,
    )
}

/// Mutation used to fill the initial population (`seed_mutation_max_blocks`).
pub fn seed_mutation(params: &VariationParams, codec: &GenomeCodec) -> Mutation {
    loop_mutation(params, codec).with_max_blocks(params.seed_mutation_max_blocks)
}

pub fn build_operator(
    params: &VariationParams,
    codec: &GenomeCodec,
    objectives: &[ObjectiveSpec],
) -> Box<dyn VariationOperator> {
    match params.strategy {
        Strategy::Genetic => Box::new(GeneticVariation::new(
            loop_mutation(params, codec),
            params.mutation_prob,
        )),
        Strategy::Generative => {
            let backend = CommandBackend::new(
                params.generative_command.clone(),
                Duration::from_secs(params.generative_timeout_secs),
            );
            Box::new(Generative::new(
                backend,
                params.generative_instruction,
                objectives.to_vec(),
            ))
        }
    }
}
