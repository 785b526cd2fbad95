//! Genomes: collections of rules keyed by innovation number.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{AlphabetConfig, MutationConfig};

use super::ids::{GenomeId, IdAllocator, RuleId};
use super::rng::EvolutionRng;
use super::rule::Rule;

/// A candidate solution: a set of rules, each keyed by its own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genome {
    /// Genome identifier.
    pub id: GenomeId,
    rules: BTreeMap<RuleId, Rule>,
}

impl Genome {
    /// Create an empty genome.
    pub fn new(id: GenomeId) -> Self {
        Self {
            id,
            rules: BTreeMap::new(),
        }
    }

    /// Create a genome from rules. A later rule replaces an earlier one with the same id.
    pub fn from_rules(id: GenomeId, rules: impl IntoIterator<Item = Rule>) -> Self {
        Self {
            id,
            rules: rules.into_iter().map(|rule| (rule.id, rule)).collect(),
        }
    }

    /// Generate a random genome with a rule count drawn from `initial_rule_count`.
    pub fn random(
        ids: &mut IdAllocator,
        rng: &mut EvolutionRng,
        alphabet: &AlphabetConfig,
    ) -> Self {
        let id = ids.next_genome();
        let count = rng.range_inclusive(alphabet.initial_rule_count);
        Self::from_rules(id, (0..count).map(|_| Rule::random(ids, rng, alphabet)))
    }

    /// Rules keyed by id.
    pub fn rules(&self) -> &BTreeMap<RuleId, Rule> {
        &self.rules
    }

    /// Look up a rule.
    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    /// Insert a rule under its own id, returning any rule it replaced.
    pub fn insert(&mut self, rule: Rule) -> Option<Rule> {
        self.rules.insert(rule.id, rule)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the genome holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Structural then pointwise mutation.
    ///
    /// With `rule_add_prob` a fresh random rule is added, with `rule_del_prob`
    /// one uniformly chosen rule is removed, then every remaining rule is mutated.
    pub fn mutate(
        &mut self,
        ids: &mut IdAllocator,
        rng: &mut EvolutionRng,
        rates: &MutationConfig,
        alphabet: &AlphabetConfig,
    ) {
        if rng.chance(rates.rule_add_prob) {
            self.insert(Rule::random(ids, rng, alphabet));
        }
        if rng.chance(rates.rule_del_prob) && !self.rules.is_empty() {
            let idx = rng.index(self.rules.len());
            if let Some(&victim) = self.rules.keys().nth(idx) {
                self.rules.remove(&victim);
            }
        }

        for rule in self.rules.values_mut() {
            rule.mutate(rng, rates, alphabet);
        }
    }

    /// Crossover over the union of rule ids.
    ///
    /// Matching rules are recombined with [`Rule::crossover`], disjoint and
    /// excess rules are inherited unchanged from whichever parent carries them.
    /// The child gets a fresh genome id.
    pub fn crossover(
        a: &Genome,
        b: &Genome,
        ids: &mut IdAllocator,
        rng: &mut EvolutionRng,
    ) -> Genome {
        let mut child = Genome::new(ids.next_genome());
        for rule_id in union_ids(a, b) {
            let rule = match (a.rules.get(&rule_id), b.rules.get(&rule_id)) {
                (Some(ra), Some(rb)) => Rule::crossover(ra, rb, rng),
                (Some(r), None) | (None, Some(r)) => r.clone(),
                (None, None) => continue,
            };
            child.insert(rule);
        }
        child
    }

    /// Average rule distance over the union of rule ids.
    ///
    /// Rules present in only one genome count as maximally distant (1.0).
    /// Two empty genomes are at distance 0.
    pub fn distance(a: &Genome, b: &Genome) -> f32 {
        let ids = union_ids(a, b);
        if ids.is_empty() {
            return 0.0;
        }

        let total: f32 = ids
            .iter()
            .map(|id| match (a.rules.get(id), b.rules.get(id)) {
                (Some(ra), Some(rb)) => Rule::distance(ra, rb),
                _ => 1.0,
            })
            .sum();

        total / ids.len() as f32
    }
}

fn union_ids(a: &Genome, b: &Genome) -> BTreeSet<RuleId> {
    a.rules.keys().chain(b.rules.keys()).copied().collect()
}
