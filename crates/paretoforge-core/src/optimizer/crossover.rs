use crate::core_types::{Genome, Origin};
use crate::error::VariationError;
use crate::optimizer::variation::{Parent, VariationOperator};
use fastrand::Rng;

/// Uniform block-wise crossover: for every block the two children either keep
/// or swap their parents' records with probability 0.5. Blocks are walked in
/// name order, one `bool` draw each.
pub fn crossover_uniform(a: &Genome, b: &Genome, rng: &mut Rng) -> (Genome, Genome) {
    let mut first = Genome::new();
    let mut second = Genome::new();

    for (name, rec_a) in a.blocks() {
        let rec_b = b.get(name).unwrap_or(rec_a.as_str());
        if rng.bool() {
            first.insert(name.as_str(), rec_b);
            second.insert(name.as_str(), rec_a.as_str());
        } else {
            first.insert(name.as_str(), rec_a.as_str());
            second.insert(name.as_str(), rec_b);
        }
    }

    (first, second)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Crossover;

impl VariationOperator for Crossover {
    fn name(&self) -> &'static str {
        "crossover"
    }

    fn arity(&self) -> usize {
        2
    }

    fn origin(&self) -> Origin {
        Origin::Crossover
    }

    fn propose(&self, parents: &[Parent<'_>], rng: &mut Rng) -> Vec<Result<Genome, VariationError>> {
        let (c1, c2) = crossover_uniform(parents[0].genome, parents[1].genome, rng);
        vec![Ok(c1), Ok(c2)]
    }
}
