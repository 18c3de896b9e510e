use crate::codec::GenomeCodec;
use crate::core_types::{Genome, Origin};
use crate::error::VariationError;
use crate::optimizer::crossover::crossover_uniform;
use crate::optimizer::mutation::Mutation;
use fastrand::Rng;
use std::collections::BTreeMap;

/// A parent as seen by a variation operator.
#[derive(Debug, Clone, Copy)]
pub struct Parent<'a> {
    pub genome: &'a Genome,
    pub raw_metrics: &'a BTreeMap<String, f64>,
}

/// Produces child genomes from `arity()` parents.
///
/// Implementations only provide `propose`; callers go through `vary`, which
/// enforces arity and child count and runs every proposal through the codec,
/// so an untrusted producer can never hand an unchecked genome to the loop.
pub trait VariationOperator: Send + Sync {
    fn name(&self) -> &'static str;

    fn arity(&self) -> usize;

    fn children(&self) -> usize {
        self.arity()
    }

    fn origin(&self) -> Origin;

    /// `parents.len() == self.arity()` is guaranteed by `vary`.
    fn propose(&self, parents: &[Parent<'_>], rng: &mut Rng) -> Vec<Result<Genome, VariationError>>;

    /// Exactly `children()` results, each either a codec-valid genome or the
    /// reason it was rejected.
    fn vary(
        &self,
        codec: &GenomeCodec,
        parents: &[Parent<'_>],
        rng: &mut Rng,
    ) -> Vec<Result<Genome, VariationError>> {
        if parents.len() != self.arity() {
            let err = VariationError::Arity {
                operator: self.name(),
                expected: self.arity(),
                got: parents.len(),
            };
            return vec![Err(err); self.children()];
        }

        let mut proposals = self.propose(parents, rng);
        proposals.truncate(self.children());
        while proposals.len() < self.children() {
            proposals.push(Err(VariationError::malformed("missing proposal", "")));
        }

        proposals
            .into_iter()
            .map(|p| p.and_then(|g| codec.validate_genome(&g).map(|_| g)))
            .collect()
    }
}

/// Crossover followed by mutation of each child with probability
/// `mutation_prob`.
#[derive(Debug, Clone)]
pub struct GeneticVariation {
    pub mutation: Mutation,
    pub mutation_prob: f64,
}

impl GeneticVariation {
    pub fn new(mutation: Mutation, mutation_prob: f64) -> Self {
        Self {
            mutation,
            mutation_prob,
        }
    }
}

impl VariationOperator for GeneticVariation {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn arity(&self) -> usize {
        2
    }

    fn origin(&self) -> Origin {
        Origin::Crossover
    }

    fn propose(&self, parents: &[Parent<'_>], rng: &mut Rng) -> Vec<Result<Genome, VariationError>> {
        let (c1, c2) = crossover_uniform(parents[0].genome, parents[1].genome, rng);

        [c1, c2]
            .into_iter()
            .map(|child| {
                if rng.f64() < self.mutation_prob {
                    self.mutation
                        .mutate(&child, rng)
                        .map_err(|e| VariationError::malformed(e.to_string(), child.to_payload()))
                } else {
                    Ok(child)
                }
            })
            .collect()
    }
}
