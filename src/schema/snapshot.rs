//! Observability types emitted by the engine once per generation.
//!
//! These are plain data: the engine never writes them anywhere itself, callers
//! decide whether to log, plot or persist them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Snapshot of a single organism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganismSnapshot {
    /// Genome identifier.
    pub genome_id: u64,
    /// Fitness score, if evaluated.
    pub fitness: Option<f32>,
    /// Species the organism belonged to when captured.
    pub species_id: Option<u64>,
    /// Rule sequences keyed by rule id.
    pub rules: BTreeMap<u64, String>,
}

/// Per-species statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesSnapshot {
    /// Species identifier.
    pub id: u64,
    /// Number of members.
    pub size: usize,
    /// Current aggregate fitness.
    pub fitness: f32,
    /// Best aggregate fitness seen.
    pub best_fitness: f32,
    /// Generation the species was founded.
    pub created_at: usize,
    /// Generation of the last improvement.
    pub last_improved: usize,
    /// Aggregate fitness per generation since founding.
    pub fitness_history: Vec<f32>,
}

/// Per-generation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSnapshot {
    /// Generation index.
    pub generation: usize,
    /// Fittest organism seen so far.
    pub fittest: Option<OrganismSnapshot>,
    /// Number of organisms in the population.
    pub num_organisms: usize,
    /// Number of species.
    pub num_species: usize,
    /// Compatibility threshold in effect.
    pub compat_threshold: f32,
    /// Statistics of every species.
    pub species: Vec<SpeciesSnapshot>,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Average fitness per generation.
    pub avg_fitness: Vec<f32>,
    /// Species count per generation.
    pub num_species: Vec<usize>,
    /// Compatibility threshold per generation.
    pub compat_threshold: Vec<f32>,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Total generations run.
    pub generations: usize,
    /// Total fitness evaluations performed.
    pub total_evaluations: u64,
    /// Best fitness achieved.
    pub best_fitness: f32,
    /// Number of times the population was reinitialized after extinction.
    pub extinctions: usize,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Fittest organism found.
    pub fittest: Option<OrganismSnapshot>,
    /// Snapshot of the last generation.
    pub last_generation: GenerationSnapshot,
    /// Statistics from the run.
    pub stats: EvolutionStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// User cancelled.
    Cancelled,
}
