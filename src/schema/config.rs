//! Configuration types for the speciated rule-set engine.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Population and generation settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Compatibility clustering and stagnation settings.
    #[serde(default)]
    pub speciation: SpeciationConfig,
    /// Structural and per-symbol mutation rates.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Symbol alphabet and sequence shape.
    #[serde(default)]
    pub alphabet: AlphabetConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Evaluate fitness on the rayon thread pool.
    #[serde(default = "default_parallel_evaluation")]
    pub parallel_evaluation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            speciation: SpeciationConfig::default(),
            mutation: MutationConfig::default(),
            alphabet: AlphabetConfig::default(),
            random_seed: None,
            parallel_evaluation: default_parallel_evaluation(),
        }
    }
}

fn default_parallel_evaluation() -> bool {
    true
}

/// Population and generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of organisms produced per generation.
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Maximum number of generations for a full run.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop early once the fittest organism reaches this score.
    #[serde(default)]
    pub target_fitness: Option<f32>,
    /// Reinitialize the population when every species is culled.
    #[serde(default = "default_reset_on_extinction")]
    pub reset_on_extinction: bool,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            max_generations: default_max_generations(),
            target_fitness: None,
            reset_on_extinction: default_reset_on_extinction(),
        }
    }
}

fn default_population_size() -> usize {
    100
}
fn default_max_generations() -> usize {
    100
}
fn default_reset_on_extinction() -> bool {
    true
}

/// Reduction applied to member fitness values to score a species.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SpeciesAggregate {
    /// Arithmetic mean of member fitness.
    #[default]
    Mean,
    /// Median member fitness.
    Median,
    /// Best member fitness.
    Max,
}

impl SpeciesAggregate {
    /// Reduce a slice of member fitness values. Empty input scores 0.
    pub fn apply(&self, values: &[f32]) -> f32 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Self::Mean => values.iter().sum::<f32>() / values.len() as f32,
            Self::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f32::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Self::Max => values.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }
}

/// Compatibility clustering and stagnation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciationConfig {
    /// Number of species the threshold controller steers toward.
    #[serde(default = "default_target_num_species")]
    pub target_num_species: usize,
    /// Initial compatibility threshold.
    #[serde(default = "default_compat_threshold_init")]
    pub compat_threshold_init: f32,
    /// Gain of the threshold controller.
    #[serde(default = "default_compat_threshold_modifier")]
    pub compat_threshold_modifier: f32,
    /// Lower clamp for the threshold.
    #[serde(default = "default_compat_threshold_min")]
    pub compat_threshold_min: f32,
    /// Generations without improvement before a species is culled.
    #[serde(default = "default_stagnation_threshold")]
    pub stagnation_threshold: usize,
    /// Number of fittest species protected from stagnation culling.
    #[serde(default = "default_num_elite_species")]
    pub num_elite_species: usize,
    /// Species fitness reduction.
    #[serde(default)]
    pub aggregate: SpeciesAggregate,
}

impl Default for SpeciationConfig {
    fn default() -> Self {
        Self {
            target_num_species: default_target_num_species(),
            compat_threshold_init: default_compat_threshold_init(),
            compat_threshold_modifier: default_compat_threshold_modifier(),
            compat_threshold_min: default_compat_threshold_min(),
            stagnation_threshold: default_stagnation_threshold(),
            num_elite_species: default_num_elite_species(),
            aggregate: SpeciesAggregate::default(),
        }
    }
}

fn default_target_num_species() -> usize {
    20
}
fn default_compat_threshold_init() -> f32 {
    3.0
}
fn default_compat_threshold_modifier() -> f32 {
    0.1
}
fn default_compat_threshold_min() -> f32 {
    0.5
}
fn default_stagnation_threshold() -> usize {
    15
}
fn default_num_elite_species() -> usize {
    1
}

/// Structural and per-symbol mutation probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Probability of adding a fresh rule to a genome.
    #[serde(default = "default_rate")]
    pub rule_add_prob: f32,
    /// Probability of deleting one rule from a genome.
    #[serde(default = "default_rate")]
    pub rule_del_prob: f32,
    /// Per-symbol probability of inserting a random symbol before it.
    #[serde(default = "default_rate")]
    pub insert_prob: f32,
    /// Per-symbol probability of dropping it.
    #[serde(default = "default_rate")]
    pub delete_prob: f32,
    /// Per-symbol probability of transposing it with its predecessor.
    #[serde(default = "default_rate")]
    pub swap_prob: f32,
    /// Per-symbol probability of redrawing its value.
    #[serde(default = "default_rate")]
    pub replace_prob: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            rule_add_prob: default_rate(),
            rule_del_prob: default_rate(),
            insert_prob: default_rate(),
            delete_prob: default_rate(),
            swap_prob: default_rate(),
            replace_prob: default_rate(),
        }
    }
}

fn default_rate() -> f32 {
    0.1
}

/// Symbol alphabet and sequence shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlphabetConfig {
    /// Symbols rules are drawn from.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<char>,
    /// Sequences are truncated to this length after mutation.
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,
    /// Length of freshly created rules.
    #[serde(default = "default_initial_sequence_length")]
    pub initial_sequence_length: usize,
    /// Inclusive bounds on the rule count of a random genome.
    #[serde(default = "default_initial_rule_count")]
    pub initial_rule_count: (usize, usize),
}

impl Default for AlphabetConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            max_sequence_length: default_max_sequence_length(),
            initial_sequence_length: default_initial_sequence_length(),
            initial_rule_count: default_initial_rule_count(),
        }
    }
}

fn default_symbols() -> Vec<char> {
    "AUGC|".chars().collect()
}
fn default_max_sequence_length() -> usize {
    100
}
fn default_initial_sequence_length() -> usize {
    8
}
fn default_initial_rule_count() -> (usize, usize) {
    (1, 8)
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Alphabet must contain at least one symbol")]
    EmptyAlphabet,
    #[error("Alphabet symbol {0:?} appears more than once")]
    DuplicateSymbol(char),
    #[error("Probability {name} must be within [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f32 },
    #[error("Invalid compatibility threshold: {0}")]
    InvalidThreshold(String),
    #[error("Maximum sequence length must be non-zero")]
    InvalidSequenceLength,
    #[error("Initial rule count bounds inverted: min {0} > max {1}")]
    InvalidRuleCount(usize, usize),
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl EngineConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population.size));
        }

        if self.alphabet.symbols.is_empty() {
            return Err(ConfigError::EmptyAlphabet);
        }
        let mut seen = HashSet::new();
        for &symbol in &self.alphabet.symbols {
            if !seen.insert(symbol) {
                return Err(ConfigError::DuplicateSymbol(symbol));
            }
        }
        if self.alphabet.max_sequence_length == 0 {
            return Err(ConfigError::InvalidSequenceLength);
        }
        let (min_rules, max_rules) = self.alphabet.initial_rule_count;
        if min_rules > max_rules {
            return Err(ConfigError::InvalidRuleCount(min_rules, max_rules));
        }

        let check_probability = |value: f32, name: &'static str| {
            if value.is_finite() && (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability { name, value })
            }
        };

        let m = &self.mutation;
        check_probability(m.rule_add_prob, "rule_add_prob")?;
        check_probability(m.rule_del_prob, "rule_del_prob")?;
        check_probability(m.insert_prob, "insert_prob")?;
        check_probability(m.delete_prob, "delete_prob")?;
        check_probability(m.swap_prob, "swap_prob")?;
        check_probability(m.replace_prob, "replace_prob")?;

        let s = &self.speciation;
        if !s.compat_threshold_min.is_finite() || s.compat_threshold_min < 0.0 {
            return Err(ConfigError::InvalidThreshold(format!(
                "minimum {} must be non-negative",
                s.compat_threshold_min
            )));
        }
        if !s.compat_threshold_init.is_finite() || s.compat_threshold_init < s.compat_threshold_min
        {
            return Err(ConfigError::InvalidThreshold(format!(
                "initial {} is below minimum {}",
                s.compat_threshold_init, s.compat_threshold_min
            )));
        }
        if !s.compat_threshold_modifier.is_finite() {
            return Err(ConfigError::InvalidThreshold(format!(
                "modifier {} must be finite",
                s.compat_threshold_modifier
            )));
        }

        Ok(())
    }
}
