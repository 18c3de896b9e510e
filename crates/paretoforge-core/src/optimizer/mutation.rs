use crate::codec::GenomeCodec;
use crate::core_types::{Genome, Origin};
use crate::error::{CodecError, VariationError};
use crate::optimizer::variation::{Parent, VariationOperator};
use fastrand::Rng;

/// Multiplies one field of each of a random subset of blocks by a factor
/// drawn from `[factor_min, factor_max]`.
#[derive(Debug, Clone)]
pub struct Mutation {
    codec: GenomeCodec,
    pub factor_min: f64,
    pub factor_max: f64,
    /// Upper bound on touched blocks; 0 means any number up to all of them.
    pub max_blocks: usize,
}

impl Mutation {
    pub fn new(codec: GenomeCodec, factor_min: f64, factor_max: f64, max_blocks: usize) -> Self {
        Self {
            codec,
            factor_min,
            factor_max,
            max_blocks,
        }
    }

    pub fn with_max_blocks(&self, max_blocks: usize) -> Self {
        Self {
            max_blocks,
            ..self.clone()
        }
    }

    pub fn mutate(&self, genome: &Genome, rng: &mut Rng) -> Result<Genome, CodecError> {
        let names: Vec<&str> = genome.names().collect();
        if names.is_empty() {
            return Ok(genome.clone());
        }

        let cap = match self.max_blocks {
            0 => names.len(),
            n => n.min(names.len()),
        };
        let touched = rng.usize(1..=cap);

        let mut order: Vec<usize> = (0..names.len()).collect();
        rng.shuffle(&mut order);

        let mut child = genome.clone();
        for &idx in &order[..touched] {
            let name = names[idx];
            let Some(record) = genome.get(name) else {
                continue;
            };
            let field_count = self.codec.field_count(record);
            if field_count == 0 {
                continue;
            }

            let field = rng.usize(0..field_count);
            let factor = self.factor_min + rng.f64() * (self.factor_max - self.factor_min);
            let mutated = self.codec.perturb(record, field, factor)?;
            child.insert(name, mutated);
        }

        Ok(child)
    }
}

impl VariationOperator for Mutation {
    fn name(&self) -> &'static str {
        "mutation"
    }

    fn arity(&self) -> usize {
        1
    }

    fn origin(&self) -> Origin {
        Origin::Mutation
    }

    fn propose(&self, parents: &[Parent<'_>], rng: &mut Rng) -> Vec<Result<Genome, VariationError>> {
        let genome = parents[0].genome;
        vec![self
            .mutate(genome, rng)
            .map_err(|e| VariationError::malformed(e.to_string(), genome.to_payload()))]
    }
}
