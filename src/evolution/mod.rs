//! Speciated evolution of variable-structure rule sets.
//!
//! # Overview
//!
//! - **Rules** (`rule`): identified symbol sequences with mutation, crossover
//!   and distance operators
//! - **Genomes** (`genome`): rule sets keyed by innovation number
//! - **Species** (`species`): clusters of organisms around a mascot
//! - **Population** (`population`): speciation, stagnation culling and the
//!   adaptive compatibility threshold
//! - **Simulation** (`simulation`): the generational loop and reproduction
//!
//! # Example
//!
//! ```rust,no_run
//! use neat_rules::evolution::{Genome, Simulation};
//! use neat_rules::schema::EngineConfig;
//!
//! let mut sim = Simulation::new(EngineConfig::default()).unwrap();
//! let result = sim
//!     .run_with_callback(&|genome: &Genome| 1.0 / genome.len().max(1) as f32, |snapshot| {
//!         println!("Generation {}: {} species", snapshot.generation, snapshot.num_species);
//!     })
//!     .unwrap();
//! println!("Best fitness: {:.3}", result.stats.best_fitness);
//! ```

mod distance;
mod fitness;
mod genome;
mod ids;
mod organism;
mod population;
mod rng;
mod rule;
mod simulation;
mod species;

pub use distance::DistanceCache;
pub use fitness::{AggregateFn, FitnessFunction, aggregate_fn};
pub use genome::Genome;
pub use ids::{GenomeId, IdAllocator, RuleId, SpeciesId};
pub use organism::Organism;
pub use population::Population;
pub use rng::EvolutionRng;
pub use rule::Rule;
pub use simulation::{EvolutionError, Simulation, offspring_quotas};
pub use species::Species;
