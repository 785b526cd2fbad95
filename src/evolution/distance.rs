//! Memoized genome distances for a single speciation pass.

use std::collections::HashMap;

use super::genome::Genome;
use super::ids::GenomeId;

/// Cache of genome distances keyed by unordered id pair.
///
/// Only valid while the genomes behind the ids are unchanged, so a cache must
/// not outlive the speciation pass that created it.
#[derive(Debug, Default)]
pub struct DistanceCache {
    entries: HashMap<(GenomeId, GenomeId), f32>,
}

impl DistanceCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Distance between `a` and `b`, computed at most once per pair.
    pub fn distance(&mut self, a: &Genome, b: &Genome) -> f32 {
        let key = if a.id <= b.id { (a.id, b.id) } else { (b.id, a.id) };
        *self
            .entries
            .entry(key)
            .or_insert_with(|| Genome::distance(a, b))
    }

    /// Number of distinct pairs computed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been computed yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
