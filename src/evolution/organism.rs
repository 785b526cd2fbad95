//! Organisms: a genome plus its evaluation and species membership.

use std::collections::BTreeMap;

use crate::schema::OrganismSnapshot;

use super::genome::Genome;
use super::ids::{GenomeId, SpeciesId};

/// A genome with its fitness and current species.
#[derive(Debug, Clone)]
pub struct Organism {
    /// Exclusively owned genome.
    pub genome: Genome,
    /// Fitness score, `None` until evaluated.
    pub fitness: Option<f32>,
    pub(crate) species: Option<SpeciesId>,
}

impl Organism {
    /// Wrap an unevaluated, unspeciated genome.
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            fitness: None,
            species: None,
        }
    }

    /// Key of this organism in the population.
    pub fn id(&self) -> GenomeId {
        self.genome.id
    }

    /// Species this organism currently belongs to.
    pub fn species(&self) -> Option<SpeciesId> {
        self.species
    }

    /// Fitness, with unevaluated organisms scoring zero.
    pub fn fitness_or_zero(&self) -> f32 {
        self.fitness.unwrap_or(0.0)
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> OrganismSnapshot {
        OrganismSnapshot {
            genome_id: self.genome.id,
            fitness: self.fitness,
            species_id: self.species,
            rules: self
                .genome
                .rules()
                .iter()
                .map(|(&id, rule)| (id, rule.as_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }
}
