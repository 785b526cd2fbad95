//! Identifier allocation for rules, genomes and species.

use serde::{Deserialize, Serialize};

/// Identity shared by homologous rules.
pub type RuleId = u64;
/// Genome identity, also the key of an organism in the population.
pub type GenomeId = u64;
/// Species identity.
pub type SpeciesId = u64;

/// Issues monotonically increasing ids. Each kind has its own counter and
/// ids start at 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    last_rule: RuleId,
    last_genome: GenomeId,
    last_species: SpeciesId,
}

impl IdAllocator {
    /// Create an allocator with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh rule id.
    pub fn next_rule(&mut self) -> RuleId {
        self.last_rule += 1;
        self.last_rule
    }

    /// Allocate a fresh genome id.
    pub fn next_genome(&mut self) -> GenomeId {
        self.last_genome += 1;
        self.last_genome
    }

    /// Allocate a fresh species id.
    pub fn next_species(&mut self) -> SpeciesId {
        self.last_species += 1;
        self.last_species
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_rule(), 1);
        assert_eq!(ids.next_rule(), 2);
        assert_eq!(ids.next_genome(), 1);
        assert_eq!(ids.next_species(), 1);
        assert_eq!(ids.next_rule(), 3);
    }
}
