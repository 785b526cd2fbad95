//! Species: compatibility clusters around a mascot.

use std::collections::BTreeSet;

use crate::schema::SpeciesSnapshot;

use super::genome::Genome;
use super::ids::{GenomeId, SpeciesId};

/// A cluster of organisms sharing a mascot.
///
/// Species only hold genome ids; the population owns the organisms. The
/// mascot's genome is kept as `representative` so the next speciation pass can
/// find the closest successor after the old organisms are gone.
#[derive(Debug, Clone)]
pub struct Species {
    /// Species identifier.
    pub id: SpeciesId,
    mascot: Option<GenomeId>,
    representative: Genome,
    members: BTreeSet<GenomeId>,
    /// Generation the species was founded.
    pub created_at: usize,
    /// Generation of the last aggregate fitness improvement.
    pub last_improved: usize,
    /// Current aggregate fitness.
    pub fitness: f32,
    /// Best aggregate fitness seen.
    pub best_fitness: f32,
    /// Aggregate fitness per generation.
    pub fitness_history: Vec<f32>,
}

impl Species {
    /// Found a species with `mascot` as its only member.
    pub fn new(id: SpeciesId, mascot: &Genome, step: usize) -> Self {
        Self {
            id,
            mascot: Some(mascot.id),
            representative: mascot.clone(),
            members: BTreeSet::from([mascot.id]),
            created_at: step,
            last_improved: step,
            fitness: 0.0,
            best_fitness: 0.0,
            fitness_history: Vec::new(),
        }
    }

    /// Current mascot, `None` between `reset` and `set_mascot`.
    pub fn mascot(&self) -> Option<GenomeId> {
        self.mascot
    }

    /// Genome of the most recent mascot.
    pub fn representative(&self) -> &Genome {
        &self.representative
    }

    /// Member genome ids, mascot included.
    pub fn members(&self) -> &BTreeSet<GenomeId> {
        &self.members
    }

    /// Whether `id` is a member.
    pub fn contains(&self, id: GenomeId) -> bool {
        self.members.contains(&id)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the species has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Clear membership and the mascot. The representative genome is kept.
    pub fn reset(&mut self) {
        self.members.clear();
        self.mascot = None;
    }

    /// Make `genome` the mascot, adding it as a member.
    pub fn set_mascot(&mut self, genome: &Genome) {
        self.members.insert(genome.id);
        self.mascot = Some(genome.id);
        self.representative = genome.clone();
    }

    /// Add a member. Returns false if it was already present.
    pub fn add(&mut self, id: GenomeId) -> bool {
        self.members.insert(id)
    }

    /// Record this generation's aggregate fitness. Returns true on improvement.
    pub fn record_fitness(&mut self, fitness: f32, step: usize) -> bool {
        self.fitness = fitness;
        self.fitness_history.push(fitness);
        if fitness > self.best_fitness {
            self.best_fitness = fitness;
            self.last_improved = step;
            true
        } else {
            false
        }
    }

    /// Generations since the last improvement.
    pub fn stagnation(&self, step: usize) -> usize {
        step.saturating_sub(self.last_improved)
    }

    /// Convert to snapshot for serialization.
    pub fn to_snapshot(&self) -> SpeciesSnapshot {
        SpeciesSnapshot {
            id: self.id,
            size: self.members.len(),
            fitness: self.fitness,
            best_fitness: self.best_fitness,
            created_at: self.created_at,
            last_improved: self.last_improved,
            fitness_history: self.fitness_history.clone(),
        }
    }
}
