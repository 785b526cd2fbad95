//! Generational loop: evaluate, cull, reproduce, retune and re-speciate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::schema::{
    ConfigError, EngineConfig, EvolutionHistory, EvolutionResult, EvolutionStats,
    GenerationSnapshot, StopReason,
};

use super::fitness::{AggregateFn, FitnessFunction, aggregate_fn};
use super::genome::Genome;
use super::ids::{GenomeId, IdAllocator};
use super::organism::Organism;
use super::population::Population;
use super::rng::EvolutionRng;

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("All species went extinct at generation {generation}")]
    Extinction { generation: usize },
}

/// Drives a population through generations.
pub struct Simulation {
    config: EngineConfig,
    rng: EvolutionRng,
    ids: IdAllocator,
    population: Population,
    aggregate: AggregateFn,
    history: EvolutionHistory,
    extinctions: usize,
    evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl Simulation {
    /// Validate `config` and create a random, speciated initial population.
    pub fn new(config: EngineConfig) -> Result<Self, EvolutionError> {
        config.validate()?;

        let mut rng = match config.random_seed {
            Some(seed) => EvolutionRng::new(seed),
            None => EvolutionRng::random(),
        };
        let mut ids = IdAllocator::new();
        let population = Population::random(&config, &mut ids, &mut rng);
        let aggregate = aggregate_fn(config.speciation.aggregate);

        Ok(Self {
            config,
            rng,
            ids,
            population,
            aggregate,
            history: EvolutionHistory::default(),
            extinctions: 0,
            evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace the species fitness reduction.
    pub fn with_aggregate<F>(mut self, aggregate: F) -> Self
    where
        F: Fn(&[f32]) -> f32 + Send + Sync + 'static,
    {
        self.aggregate = Box::new(aggregate);
        self
    }

    /// Get cancellation handle. Checked between generations only.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of extinction resets so far.
    pub fn extinctions(&self) -> usize {
        self.extinctions
    }

    /// Score every organism and update the fittest-ever organism.
    ///
    /// Each evaluation writes only its own organism; the fittest is updated
    /// after all evaluations have finished.
    pub fn evaluate<F: FitnessFunction>(&mut self, fitness: &F) {
        let organisms = self.population.organisms_mut();
        if self.config.parallel_evaluation {
            organisms.par_iter_mut().for_each(|(_, organism)| {
                organism.fitness = Some(fitness.evaluate(&organism.genome));
            });
        } else {
            for organism in organisms.values_mut() {
                organism.fitness = Some(fitness.evaluate(&organism.genome));
            }
        }

        self.evaluations += organisms.len() as u64;
        self.population.update_fittest();
    }

    /// Advance one generation. Organisms must have been evaluated.
    ///
    /// Species statistics are refreshed and stagnant species culled. If that
    /// leaves no species the population is reinitialized (or an error returned
    /// when `reset_on_extinction` is off) and the generation counter is left
    /// untouched. Otherwise offspring replace the population, the
    /// compatibility threshold is adjusted and the offspring are speciated.
    pub fn next_generation(&mut self) -> Result<(), EvolutionError> {
        self.population.update_species_stats(&*self.aggregate);
        self.population.check_stagnation(&self.config.speciation);

        if self.population.species().is_empty() {
            let generation = self.population.step;
            if !self.config.population.reset_on_extinction {
                return Err(EvolutionError::Extinction { generation });
            }
            warn!("All species extinct at generation {generation}, reinitializing population");
            self.population
                .reinitialize(&self.config, &mut self.ids, &mut self.rng);
            self.extinctions += 1;
            return Ok(());
        }

        let offspring = self.reproduce();
        self.population.replace_organisms(offspring);
        self.population
            .adjust_compat_threshold(&self.config.speciation, self.config.population.size);
        self.population.speciate(&mut self.ids);
        self.population.step += 1;

        debug!(
            "Generation {}: {} organisms in {} species, threshold {:.3}",
            self.population.step,
            self.population.len(),
            self.population.species().len(),
            self.population.compat_threshold
        );
        Ok(())
    }

    /// Breed the next generation from the current species.
    ///
    /// Each species receives a share of `population.size` proportional to its
    /// fitness. Parents are drawn with replacement, weighted by fitness, from
    /// the species' own members.
    fn reproduce(&mut self) -> BTreeMap<GenomeId, Organism> {
        let species: Vec<_> = self.population.species().values().collect();
        let fitness: Vec<f32> = species.iter().map(|s| s.fitness).collect();
        let quotas = offspring_quotas(&fitness, self.config.population.size);

        let mut next = BTreeMap::new();
        for (species, quota) in species.into_iter().zip(quotas) {
            let members: Vec<&Organism> = species
                .members()
                .iter()
                .filter_map(|id| self.population.organisms().get(id))
                .collect();
            if members.is_empty() {
                continue;
            }
            let weights: Vec<f32> = members.iter().map(|o| o.fitness_or_zero()).collect();

            for _ in 0..quota {
                let parent1 = members[self.rng.weighted_index(&weights)];
                let parent2 = members[self.rng.weighted_index(&weights)];

                let mut child =
                    Genome::crossover(&parent1.genome, &parent2.genome, &mut self.ids, &mut self.rng);
                child.mutate(
                    &mut self.ids,
                    &mut self.rng,
                    &self.config.mutation,
                    &self.config.alphabet,
                );
                next.insert(child.id, Organism::new(child));
            }
        }
        next
    }

    /// Current generation snapshot.
    pub fn snapshot(&self) -> GenerationSnapshot {
        self.population.snapshot()
    }

    fn record_history(&mut self) {
        let organisms = self.population.organisms();
        let scores: Vec<f32> = organisms.values().map(Organism::fitness_or_zero).collect();
        let best = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let avg = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        };

        self.history.best_fitness.push(best);
        self.history.avg_fitness.push(avg);
        self.history
            .num_species
            .push(self.population.species().len());
        self.history
            .compat_threshold
            .push(self.population.compat_threshold);
    }

    fn best_fitness(&self) -> f32 {
        self.population
            .fittest()
            .map_or(f32::NEG_INFINITY, Organism::fitness_or_zero)
    }

    /// Run evolution with a per-generation callback.
    ///
    /// Each generation is evaluated, reported to `callback`, then bred. The
    /// run stops after `max_generations`, when the fittest organism reaches
    /// `target_fitness`, or when the cancellation handle is set.
    pub fn run_with_callback<F, C>(
        &mut self,
        fitness: &F,
        callback: C,
    ) -> Result<EvolutionResult, EvolutionError>
    where
        F: FitnessFunction,
        C: Fn(&GenerationSnapshot),
    {
        let start_time = Instant::now();
        let mut generations = 0;

        let stop_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if generations >= self.config.population.max_generations {
                break StopReason::MaxGenerations;
            }

            self.evaluate(fitness);
            self.record_history();
            callback(&self.snapshot());

            if let Some(target) = self.config.population.target_fitness
                && self.best_fitness() >= target
            {
                break StopReason::TargetReached;
            }

            self.next_generation()?;
            generations += 1;
        };

        info!(
            "Evolution stopped after {} generations ({:?}), best fitness {:.4}",
            generations,
            stop_reason,
            self.best_fitness()
        );

        Ok(EvolutionResult {
            fittest: self.population.fittest().map(Organism::to_snapshot),
            last_generation: self.snapshot(),
            stats: EvolutionStats {
                generations,
                total_evaluations: self.evaluations,
                best_fitness: self.best_fitness(),
                extinctions: self.extinctions,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    /// Run evolution (blocking).
    pub fn run<F: FitnessFunction>(&mut self, fitness: &F) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(fitness, |_| {})
    }
}

/// Split `total` offspring across species in proportion to their fitness.
///
/// Shares are rounded, then adjusted one slot at a time by largest remainder
/// so the quotas always sum to `total`. Negative fitness counts as zero, and
/// when no species has positive fitness every species gets an equal share.
pub fn offspring_quotas(fitness: &[f32], total: usize) -> Vec<usize> {
    if fitness.is_empty() {
        return Vec::new();
    }

    let clamped: Vec<f64> = fitness
        .iter()
        .map(|&f| if f.is_finite() { f64::from(f.max(0.0)) } else { 0.0 })
        .collect();
    let sum: f64 = clamped.iter().sum();

    let shares: Vec<f64> = if sum > 0.0 {
        clamped.iter().map(|f| f / sum * total as f64).collect()
    } else {
        vec![total as f64 / fitness.len() as f64; fitness.len()]
    };
    let mut quotas: Vec<usize> = shares.iter().map(|s| s.round() as usize).collect();

    let mut assigned: usize = quotas.iter().sum();
    while assigned < total {
        let idx = (0..quotas.len())
            .min_by(|&a, &b| {
                (quotas[a] as f64 - shares[a]).total_cmp(&(quotas[b] as f64 - shares[b]))
            })
            .unwrap_or(0);
        quotas[idx] += 1;
        assigned += 1;
    }
    while assigned > total {
        let idx = (0..quotas.len())
            .filter(|&i| quotas[i] > 0)
            .max_by(|&a, &b| {
                (quotas[a] as f64 - shares[a]).total_cmp(&(quotas[b] as f64 - shares[b]))
            })
            .unwrap_or(0);
        quotas[idx] -= 1;
        assigned -= 1;
    }

    quotas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{PopulationConfig, SpeciationConfig};

    fn small_config(size: usize) -> EngineConfig {
        EngineConfig {
            population: PopulationConfig {
                size,
                max_generations: 5,
                ..Default::default()
            },
            random_seed: Some(42),
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = small_config(10);
        config.mutation.insert_prob = 2.0;
        assert!(matches!(
            Simulation::new(config),
            Err(EvolutionError::Config(ConfigError::InvalidProbability { .. }))
        ));
        assert!(Simulation::new(small_config(0)).is_err());
    }

    #[test]
    fn test_quotas_proportional() {
        assert_eq!(offspring_quotas(&[1.0, 3.0], 8), vec![2, 6]);
        assert_eq!(offspring_quotas(&[], 8), Vec::<usize>::new());
    }

    #[test]
    fn test_quotas_zero_fitness_uniform() {
        let quotas = offspring_quotas(&[0.0, 0.0, 0.0], 10);
        assert_eq!(quotas.iter().sum::<usize>(), 10);
        assert!(quotas.iter().all(|&q| q == 3 || q == 4));

        let negative = offspring_quotas(&[-1.0, -2.0], 6);
        assert_eq!(negative, vec![3, 3]);
    }

    #[test]
    fn test_quotas_reconcile_rounding() {
        // Both shares of 1.5 round up to 2.
        let quotas = offspring_quotas(&[1.0, 1.0], 3);
        assert_eq!(quotas.iter().sum::<usize>(), 3);
        assert!(quotas.contains(&1) && quotas.contains(&2));
        let quotas = offspring_quotas(&[0.2, 0.3, 0.5, 0.0], 7);
        assert_eq!(quotas.iter().sum::<usize>(), 7);
        assert_eq!(quotas[3], 0);
    }

    #[test]
    fn test_zero_fitness_generation_keeps_size() {
        let mut sim = Simulation::new(small_config(10)).unwrap();
        sim.evaluate(&|_: &Genome| 0.0_f32);
        sim.next_generation().unwrap();

        assert_eq!(sim.population().len(), 10);
        assert_eq!(sim.population().step, 1);
        assert!(sim.population().is_partitioned());
    }

    #[test]
    fn test_generations_preserve_partition() {
        let mut sim = Simulation::new(small_config(30)).unwrap();
        let fitness = |genome: &Genome| 1.0 / (1.0 + genome.len() as f32);
        for _ in 0..5 {
            sim.evaluate(&fitness);
            sim.next_generation().unwrap();
            assert!(sim.population().is_partitioned());
            assert_eq!(sim.population().len(), 30);
            assert!(
                sim.population().compat_threshold >= sim.config().speciation.compat_threshold_min
            );
        }
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let fitness = |genome: &Genome| genome.len() as f32;
        let mut parallel = Simulation::new(small_config(20)).unwrap();
        let mut sequential = Simulation::new(EngineConfig {
            parallel_evaluation: false,
            ..small_config(20)
        })
        .unwrap();

        parallel.evaluate(&fitness);
        sequential.evaluate(&fitness);
        let a: Vec<_> = parallel.population().organisms().values().map(|o| o.fitness).collect();
        let b: Vec<_> = sequential.population().organisms().values().map(|o| o.fitness).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extinction_resets_population() {
        let config = EngineConfig {
            speciation: SpeciationConfig {
                stagnation_threshold: 0,
                num_elite_species: 0,
                ..Default::default()
            },
            ..small_config(12)
        };
        let mut sim = Simulation::new(config).unwrap();
        sim.evaluate(&|_: &Genome| 0.0_f32);
        sim.next_generation().unwrap();
        sim.evaluate(&|_: &Genome| 0.0_f32);
        sim.next_generation().unwrap();

        assert_eq!(sim.extinctions(), 1);
        assert_eq!(sim.population().step, 1);
        assert_eq!(sim.population().len(), 12);
        assert!(sim.population().is_partitioned());
        assert!(sim.population().fittest().is_some());
    }

    #[test]
    fn test_extinction_error_without_reset() {
        let mut config = EngineConfig {
            speciation: SpeciationConfig {
                stagnation_threshold: 0,
                num_elite_species: 0,
                ..Default::default()
            },
            ..small_config(12)
        };
        config.population.reset_on_extinction = false;

        let mut sim = Simulation::new(config).unwrap();
        sim.evaluate(&|_: &Genome| 0.0_f32);
        sim.next_generation().unwrap();
        sim.evaluate(&|_: &Genome| 0.0_f32);
        assert!(matches!(
            sim.next_generation(),
            Err(EvolutionError::Extinction { generation: 1 })
        ));
    }

    #[test]
    fn test_run_to_max_generations() {
        let mut sim = Simulation::new(small_config(16)).unwrap();
        let result = sim.run(&|genome: &Genome| genome.len() as f32).unwrap();

        assert_eq!(result.stats.generations, 5);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.history.best_fitness.len(), 5);
        assert_eq!(result.stats.total_evaluations, 5 * 16);
        assert!(result.fittest.is_some());
    }

    #[test]
    fn test_run_stops_at_target() {
        let mut config = small_config(16);
        config.population.target_fitness = Some(0.5);
        let mut sim = Simulation::new(config).unwrap();
        let result = sim.run(&|_: &Genome| 1.0_f32).unwrap();

        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_cancellation() {
        let mut sim = Simulation::new(small_config(8)).unwrap();
        let cancel = sim.cancel_handle();
        cancel.store(true, Ordering::Relaxed);

        let result = sim.run(&|_: &Genome| 1.0_f32).unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.total_evaluations, 0);
    }

    #[test]
    fn test_custom_aggregate_and_snapshot_serializes() {
        let mut sim = Simulation::new(small_config(8))
            .unwrap()
            .with_aggregate(|values: &[f32]| values.len() as f32);
        sim.evaluate(&|_: &Genome| 1.0_f32);
        sim.next_generation().unwrap();

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.num_species, snapshot.species.len());
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: GenerationSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.num_organisms, 8);
    }
}
