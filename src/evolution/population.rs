//! Population: the organism arena, its species partition and the adaptive
//! compatibility threshold.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, trace};

use crate::schema::{EngineConfig, GenerationSnapshot, SpeciationConfig};

use super::distance::DistanceCache;
use super::genome::Genome;
use super::ids::{GenomeId, IdAllocator, SpeciesId};
use super::organism::Organism;
use super::rng::EvolutionRng;
use super::species::Species;

/// All organisms of one generation, clustered into species.
///
/// After every [`Population::speciate`] call the species member sets partition
/// the organism set exactly and each organism's species back-reference names
/// the species holding it.
#[derive(Debug, Clone)]
pub struct Population {
    organisms: BTreeMap<GenomeId, Organism>,
    species: BTreeMap<SpeciesId, Species>,
    /// Generation counter.
    pub step: usize,
    /// Distance cutoff for joining an existing species.
    pub compat_threshold: f32,
    fittest: Option<Organism>,
}

impl Population {
    /// Create an unspeciated population.
    pub fn new(organisms: impl IntoIterator<Item = Organism>, compat_threshold: f32) -> Self {
        Self {
            organisms: organisms.into_iter().map(|o| (o.id(), o)).collect(),
            species: BTreeMap::new(),
            step: 0,
            compat_threshold,
            fittest: None,
        }
    }

    /// Random population of `population.size` organisms, already speciated.
    pub fn random(config: &EngineConfig, ids: &mut IdAllocator, rng: &mut EvolutionRng) -> Self {
        let organisms: Vec<Organism> = (0..config.population.size)
            .map(|_| Organism::new(Genome::random(ids, rng, &config.alphabet)))
            .collect();
        let mut population = Self::new(organisms, config.speciation.compat_threshold_init);
        population.speciate(ids);
        population
    }

    /// Replace every organism and species with a fresh random population.
    ///
    /// The generation counter and the fittest-ever organism are kept.
    pub fn reinitialize(
        &mut self,
        config: &EngineConfig,
        ids: &mut IdAllocator,
        rng: &mut EvolutionRng,
    ) {
        let step = self.step;
        let fittest = self.fittest.take();
        *self = Self {
            step,
            fittest,
            ..Self::new(
                (0..config.population.size)
                    .map(|_| Organism::new(Genome::random(ids, rng, &config.alphabet))),
                config.speciation.compat_threshold_init,
            )
        };
        self.speciate(ids);
    }

    /// Organisms keyed by genome id.
    pub fn organisms(&self) -> &BTreeMap<GenomeId, Organism> {
        &self.organisms
    }

    pub(crate) fn organisms_mut(&mut self) -> &mut BTreeMap<GenomeId, Organism> {
        &mut self.organisms
    }

    /// Species keyed by id.
    pub fn species(&self) -> &BTreeMap<SpeciesId, Species> {
        &self.species
    }

    /// Fittest organism seen so far.
    pub fn fittest(&self) -> Option<&Organism> {
        self.fittest.as_ref()
    }

    /// Number of organisms.
    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    /// Whether the population holds no organisms.
    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    /// Install the next generation's organisms.
    ///
    /// Species keep their statistics and representative genome but lose their
    /// members until the next [`Population::speciate`].
    pub fn replace_organisms(&mut self, organisms: BTreeMap<GenomeId, Organism>) {
        self.organisms = organisms;
        for species in self.species.values_mut() {
            species.reset();
        }
    }

    /// Update the fittest-ever organism from the current evaluations.
    pub fn update_fittest(&mut self) {
        let best = self
            .organisms
            .values()
            .filter(|o| o.fitness.is_some())
            .max_by(|a, b| a.fitness_or_zero().total_cmp(&b.fitness_or_zero()));

        if let Some(best) = best {
            let improved = self
                .fittest
                .as_ref()
                .is_none_or(|f| best.fitness_or_zero() > f.fitness_or_zero());
            if improved {
                self.fittest = Some(best.clone());
            }
        }
    }

    /// Cluster organisms into species.
    ///
    /// Every existing species first claims, as its new mascot, the unclaimed
    /// organism closest to its previous mascot. A species that finds nothing
    /// left to claim is dropped. Every remaining organism then joins the
    /// species with the closest mascot if that distance is below the
    /// compatibility threshold, or founds a new species.
    pub fn speciate(&mut self, ids: &mut IdAllocator) {
        let mut cache = DistanceCache::new();
        let mut unclaimed: BTreeSet<GenomeId> = self.organisms.keys().copied().collect();
        for organism in self.organisms.values_mut() {
            organism.species = None;
        }

        let mut dropped = Vec::new();
        for species in self.species.values_mut() {
            species.reset();

            let closest = unclaimed
                .iter()
                .map(|id| {
                    let genome = &self.organisms[id].genome;
                    (*id, cache.distance(species.representative(), genome))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            match closest {
                Some((id, _)) => {
                    unclaimed.remove(&id);
                    if let Some(organism) = self.organisms.get_mut(&id) {
                        species.set_mascot(&organism.genome);
                        organism.species = Some(species.id);
                    }
                }
                None => dropped.push(species.id),
            }
        }
        for id in dropped {
            debug!("Species {id} dropped: no organism left to claim");
            self.species.remove(&id);
        }

        let mut founded = 0;
        for id in unclaimed {
            let genome = &self.organisms[&id].genome;
            let closest = self
                .species
                .values()
                .map(|s| (s.id, cache.distance(genome, s.representative())))
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let species_id = match closest {
                Some((species_id, distance)) if distance < self.compat_threshold => {
                    if let Some(species) = self.species.get_mut(&species_id) {
                        species.add(id);
                    }
                    species_id
                }
                _ => {
                    let species_id = ids.next_species();
                    self.species
                        .insert(species_id, Species::new(species_id, genome, self.step));
                    founded += 1;
                    species_id
                }
            };

            if let Some(organism) = self.organisms.get_mut(&id) {
                organism.species = Some(species_id);
            }
        }

        debug!(
            "Speciated {} organisms into {} species ({} new, {} distances computed)",
            self.organisms.len(),
            self.species.len(),
            founded,
            cache.len()
        );
    }

    /// Recompute every species' aggregate fitness and improvement marker.
    pub fn update_species_stats(&mut self, aggregate: &dyn Fn(&[f32]) -> f32) {
        for species in self.species.values_mut() {
            let values: Vec<f32> = species
                .members()
                .iter()
                .filter_map(|id| self.organisms.get(id))
                .map(Organism::fitness_or_zero)
                .collect();
            species.record_fitness(aggregate(&values), self.step);
        }
    }

    /// Cull stagnant species and their organisms.
    ///
    /// The `num_elite_species` fittest species are never culled. Any other
    /// species that has not improved for more than `stagnation_threshold`
    /// generations is removed along with all of its members. Returns the ids
    /// of the removed species.
    pub fn check_stagnation(&mut self, config: &SpeciationConfig) -> Vec<SpeciesId> {
        let mut ranked: Vec<(SpeciesId, f32)> =
            self.species.values().map(|s| (s.id, s.fitness)).collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        ranked.truncate(ranked.len().saturating_sub(config.num_elite_species));

        let step = self.step;
        let stagnant: Vec<SpeciesId> = ranked
            .into_iter()
            .map(|(id, _)| id)
            .filter(|id| {
                self.species[id].stagnation(step) > config.stagnation_threshold
            })
            .collect();

        for id in &stagnant {
            if let Some(species) = self.species.remove(id) {
                for member in species.members() {
                    self.organisms.remove(member);
                }
                info!(
                    "Species {} culled at generation {}: no improvement since {} ({} organisms)",
                    id,
                    step,
                    species.last_improved,
                    species.len()
                );
            }
        }

        stagnant
    }

    /// Proportional controller steering the species count toward the target.
    pub fn adjust_compat_threshold(&mut self, config: &SpeciationConfig, population_size: usize) {
        let diff = self.species.len() as f32 - config.target_num_species as f32;
        let adjusted = self.compat_threshold
            + diff / population_size as f32 * config.compat_threshold_modifier;
        trace!(
            "Compatibility threshold {} -> {}",
            self.compat_threshold, adjusted
        );
        self.compat_threshold = adjusted.max(config.compat_threshold_min);
    }

    /// Whether species membership partitions the organism set exactly.
    pub fn is_partitioned(&self) -> bool {
        let mut seen = BTreeSet::new();
        for species in self.species.values() {
            if species.mascot().is_none_or(|m| !species.contains(m)) {
                return false;
            }
            for &id in species.members() {
                let back_ref = self.organisms.get(&id).and_then(Organism::species);
                if back_ref != Some(species.id) || !seen.insert(id) {
                    return false;
                }
            }
        }
        seen.len() == self.organisms.len()
    }

    /// Per-generation snapshot for observers.
    pub fn snapshot(&self) -> GenerationSnapshot {
        GenerationSnapshot {
            generation: self.step,
            fittest: self.fittest.as_ref().map(Organism::to_snapshot),
            num_organisms: self.organisms.len(),
            num_species: self.species.len(),
            compat_threshold: self.compat_threshold,
            species: self.species.values().map(Species::to_snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evolution::Rule;
    use crate::schema::SpeciesAggregate;

    /// Organisms in two homologous groups: rule 1 carriers and rule 2 carriers.
    fn two_clusters(ids: &mut IdAllocator, per_cluster: usize) -> Vec<Organism> {
        let mut organisms = Vec::new();
        for rule_id in [1, 2] {
            for _ in 0..per_cluster {
                let genome = Genome::from_rules(ids.next_genome(), [Rule::new(rule_id, "AUGC")]);
                organisms.push(Organism::new(genome));
            }
        }
        organisms
    }

    fn mean(values: &[f32]) -> f32 {
        SpeciesAggregate::Mean.apply(values)
    }

    #[test]
    fn test_speciate_partitions() {
        let mut ids = IdAllocator::new();
        let mut rng = EvolutionRng::new(42);
        let config = EngineConfig::default();
        let population = Population::random(&config, &mut ids, &mut rng);

        assert_eq!(population.len(), config.population.size);
        assert!(!population.species().is_empty());
        assert!(population.is_partitioned());
    }

    #[test]
    fn test_speciate_separates_clusters() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 3), 0.5);
        population.speciate(&mut ids);

        assert_eq!(population.species().len(), 2);
        assert!(population.species().values().all(|s| s.len() == 3));
        assert!(population.is_partitioned());

        // Re-speciating keeps species identities.
        let before: Vec<SpeciesId> = population.species().keys().copied().collect();
        population.speciate(&mut ids);
        let after: Vec<SpeciesId> = population.species().keys().copied().collect();
        assert_eq!(before, after);
        assert!(population.is_partitioned());
    }

    #[test]
    fn test_speciate_after_replacement_tracks_mascot() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 2), 0.5);
        population.speciate(&mut ids);
        let rule_one_species = population
            .species()
            .values()
            .find(|s| s.representative().rule(1).is_some())
            .map(|s| s.id)
            .unwrap();

        // Next generation: one descendant per cluster.
        let next: BTreeMap<GenomeId, Organism> = [1, 2]
            .into_iter()
            .map(|rule_id| {
                let genome = Genome::from_rules(ids.next_genome(), [Rule::new(rule_id, "AUGG")]);
                (genome.id, Organism::new(genome))
            })
            .collect();
        population.replace_organisms(next);
        assert!(population.species().values().all(Species::is_empty));

        population.speciate(&mut ids);
        assert!(population.is_partitioned());
        assert_eq!(population.species().len(), 2);
        let mascot = population.species()[&rule_one_species].mascot().unwrap();
        assert!(population.organisms()[&mascot].genome.rule(1).is_some());
    }

    #[test]
    fn test_species_without_candidates_are_dropped() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 1), 0.5);
        population.speciate(&mut ids);
        assert_eq!(population.species().len(), 2);

        let survivor = Genome::from_rules(ids.next_genome(), [Rule::new(1, "AUGC")]);
        population.replace_organisms(BTreeMap::from([(survivor.id, Organism::new(survivor))]));
        population.speciate(&mut ids);
        assert_eq!(population.species().len(), 1);
        assert!(population.is_partitioned());
    }

    #[test]
    fn test_stagnant_species_removed_with_organisms() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 3), 0.5);
        population.speciate(&mut ids);

        for organism in population.organisms_mut().values_mut() {
            let fitness = if organism.genome.rule(1).is_some() { 1.0 } else { 0.0 };
            organism.fitness = Some(fitness);
        }
        population.update_species_stats(&mean);

        let config = SpeciationConfig {
            stagnation_threshold: 5,
            num_elite_species: 1,
            ..SpeciationConfig::default()
        };
        population.step = 6;
        population.update_species_stats(&mean);
        let removed = population.check_stagnation(&config);

        assert_eq!(removed.len(), 1);
        assert_eq!(population.species().len(), 1);
        assert_eq!(population.len(), 3);
        assert!(population
            .organisms()
            .values()
            .all(|o| o.genome.rule(1).is_some()));
    }

    #[test]
    fn test_stagnation_respects_elite_count() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 2), 0.5);
        population.speciate(&mut ids);
        population.update_species_stats(&mean);

        let config = SpeciationConfig {
            stagnation_threshold: 0,
            num_elite_species: 1,
            ..SpeciationConfig::default()
        };
        population.step = 10;
        let species_before = population.species().len();
        let removed = population.check_stagnation(&config);
        assert!(removed.len() <= species_before - config.num_elite_species);
        assert_eq!(population.species().len(), 1);

        let all_elite = SpeciationConfig {
            num_elite_species: 5,
            ..config
        };
        assert!(population.check_stagnation(&all_elite).is_empty());
    }

    #[test]
    fn test_threshold_decreases_when_species_wanted() {
        let mut population = Population::new(Vec::new(), 3.0);
        let mut ids = IdAllocator::new();
        for _ in 0..5 {
            let id = ids.next_species();
            population
                .species
                .insert(id, Species::new(id, &Genome::new(ids.next_genome()), 0));
        }
        let config = SpeciationConfig {
            target_num_species: 20,
            compat_threshold_modifier: 0.1,
            compat_threshold_min: 0.5,
            ..SpeciationConfig::default()
        };

        population.adjust_compat_threshold(&config, 10);
        assert!((population.compat_threshold - 2.85).abs() < 1e-5);

        population.compat_threshold = 0.55;
        population.adjust_compat_threshold(&config, 10);
        assert!((population.compat_threshold - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_update_fittest_keeps_best_ever() {
        let mut ids = IdAllocator::new();
        let mut population = Population::new(two_clusters(&mut ids, 1), 0.5);
        assert!(population.fittest().is_none());

        for (i, organism) in population.organisms_mut().values_mut().enumerate() {
            organism.fitness = Some(i as f32 + 1.0);
        }
        population.update_fittest();
        assert_eq!(population.fittest().and_then(|o| o.fitness), Some(2.0));

        for organism in population.organisms_mut().values_mut() {
            organism.fitness = Some(0.5);
        }
        population.update_fittest();
        assert_eq!(population.fittest().and_then(|o| o.fitness), Some(2.0));
    }
}
