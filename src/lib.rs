//! NEAT-style speciated evolution of variable-length rule sets.
//!
//! Genomes are sets of symbol sequences ("rules") keyed by innovation number.
//! A population is clustered into species by genome distance under an
//! adaptively tuned compatibility threshold, stagnant species are culled, and
//! offspring are allocated to species in proportion to their fitness. The
//! fitness function is supplied by the caller.
//!
//! # Architecture
//!
//! - `schema`: Configuration and per-generation snapshot types
//! - `evolution`: Rules, genomes, species, population and the generation loop
//!
//! # Example
//!
//! ```rust,no_run
//! use neat_rules::{EngineConfig, Genome, Simulation};
//!
//! let config = EngineConfig::default();
//! let mut sim = Simulation::new(config).unwrap();
//!
//! // Favour genomes with fewer rules.
//! let result = sim.run(&|genome: &Genome| 1.0 / (1.0 + genome.len() as f32)).unwrap();
//! println!("Best fitness after {} generations: {}",
//!     result.stats.generations, result.stats.best_fitness);
//! ```

pub mod evolution;
pub mod schema;

// Re-export commonly used types
pub use evolution::{EvolutionError, FitnessFunction, Genome, Population, Rule, Simulation};
pub use schema::{EngineConfig, GenerationSnapshot};
