//! Fitness seams supplied by the embedding application.

use crate::schema::SpeciesAggregate;

use super::genome::Genome;

/// Scores a genome. Must be a pure function of genome content; the engine may
/// call it from several threads at once.
pub trait FitnessFunction: Sync {
    /// Fitness of `genome`, higher is better.
    fn evaluate(&self, genome: &Genome) -> f32;
}

impl<F> FitnessFunction for F
where
    F: Fn(&Genome) -> f32 + Sync,
{
    fn evaluate(&self, genome: &Genome) -> f32 {
        self(genome)
    }
}

/// Reduction from member fitness values to a species score.
pub type AggregateFn = Box<dyn Fn(&[f32]) -> f32 + Send + Sync>;

/// Boxed reduction for a configured aggregate.
pub fn aggregate_fn(aggregate: SpeciesAggregate) -> AggregateFn {
    Box::new(move |values| aggregate.apply(values))
}
