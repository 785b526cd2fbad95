//! Rules: identified symbol sequences, the atomic unit of variation.

use serde::{Deserialize, Serialize};

use crate::schema::{AlphabetConfig, MutationConfig};

use super::ids::{IdAllocator, RuleId};
use super::rng::EvolutionRng;

/// A mutable symbol sequence with a stable identity.
///
/// Two rules are homologous iff they share `id`. Homology only arises through
/// ancestry (copying or crossover), never from matching content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Innovation number shared with homologous rules in other genomes.
    pub id: RuleId,
    /// Symbols over the configured alphabet.
    pub sequence: Vec<char>,
}

impl Rule {
    /// Create a rule from an id and a string of symbols.
    pub fn new(id: RuleId, sequence: &str) -> Self {
        Self {
            id,
            sequence: sequence.chars().collect(),
        }
    }

    /// Create a rule with a fresh id and `initial_sequence_length` random symbols.
    pub fn random(
        ids: &mut IdAllocator,
        rng: &mut EvolutionRng,
        alphabet: &AlphabetConfig,
    ) -> Self {
        let length = alphabet
            .initial_sequence_length
            .min(alphabet.max_sequence_length);
        Self {
            id: ids.next_rule(),
            sequence: (0..length).map(|_| rng.symbol(&alphabet.symbols)).collect(),
        }
    }

    /// Sequence length.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Whether the sequence has no symbols.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Sequence rendered as a string.
    pub fn as_string(&self) -> String {
        self.sequence.iter().collect()
    }

    /// Pointwise mutation.
    ///
    /// Each position independently draws, in order: an insertion of a random
    /// symbol before it, a deletion, a swap with the previously emitted symbol
    /// and a replacement of its value. A deleted symbol skips the later draws.
    /// The result is truncated to `max_sequence_length`.
    pub fn mutate(
        &mut self,
        rng: &mut EvolutionRng,
        rates: &MutationConfig,
        alphabet: &AlphabetConfig,
    ) {
        let mut mutated = Vec::with_capacity(self.sequence.len() + 1);

        for &symbol in &self.sequence {
            if rng.chance(rates.insert_prob) {
                mutated.push(rng.symbol(&alphabet.symbols));
            }
            if rng.chance(rates.delete_prob) {
                continue;
            }
            let swap = rng.chance(rates.swap_prob);
            let value = if rng.chance(rates.replace_prob) {
                rng.symbol(&alphabet.symbols)
            } else {
                symbol
            };

            if swap && !mutated.is_empty() {
                let last = mutated.len() - 1;
                mutated.insert(last, value);
            } else {
                mutated.push(value);
            }
        }

        mutated.truncate(alphabet.max_sequence_length);
        self.sequence = mutated;
    }

    /// Uniform crossover of two homologous rules.
    ///
    /// Positions up to the shorter length are drawn from either parent with
    /// equal probability, then the tail of the longer parent is appended. The
    /// child keeps the shared parent id so homology survives recombination.
    ///
    /// # Panics
    ///
    /// Panics if the rules are not homologous.
    pub fn crossover(a: &Rule, b: &Rule, rng: &mut EvolutionRng) -> Rule {
        assert_eq!(a.id, b.id, "cannot cross non-homologous rules");

        let shared = a.len().min(b.len());
        let mut sequence = Vec::with_capacity(a.len().max(b.len()));
        for (&x, &y) in a.sequence.iter().zip(&b.sequence) {
            sequence.push(if rng.coin() { x } else { y });
        }

        let longer = if a.len() > b.len() { a } else { b };
        sequence.extend_from_slice(&longer.sequence[shared..]);

        Rule { id: a.id, sequence }
    }

    /// Normalized positional distance between homologous rules in `[0, 1]`.
    ///
    /// Counts mismatches over the shared prefix plus the length difference,
    /// divided by the longer length. Two empty rules are identical.
    ///
    /// # Panics
    ///
    /// Panics if the rules are not homologous.
    pub fn distance(a: &Rule, b: &Rule) -> f32 {
        assert_eq!(a.id, b.id, "cannot compare non-homologous rules");

        let longest = a.len().max(b.len());
        if longest == 0 {
            return 0.0;
        }

        let mismatches = a
            .sequence
            .iter()
            .zip(&b.sequence)
            .filter(|(x, y)| x != y)
            .count();
        let length_diff = a.len().abs_diff(b.len());

        (mismatches + length_diff) as f32 / longest as f32
    }
}
