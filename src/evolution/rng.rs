//! Seedable random source for the evolutionary operators.

use rand::distributions::WeightedIndex;
use rand::prelude::*;

/// Random number generator wrapper for evolution.
#[derive(Debug, Clone)]
pub struct EvolutionRng {
    rng: StdRng,
}

impl EvolutionRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniformly pick a symbol.
    ///
    /// # Panics
    ///
    /// Panics if `alphabet` is empty. Validated configs never are.
    pub fn symbol(&mut self, alphabet: &[char]) -> char {
        *alphabet
            .choose(&mut self.rng)
            .expect("alphabet must not be empty")
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform integer in an inclusive range.
    pub fn range_inclusive(&mut self, bounds: (usize, usize)) -> usize {
        self.rng.gen_range(bounds.0..=bounds.1)
    }

    /// Bernoulli trial with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.rng.r#gen::<f32>() < p
    }

    /// Fair coin.
    pub fn coin(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    /// Sample an index proportionally to `weights`, with replacement.
    ///
    /// Non-positive weights count as zero. When no weight is positive the
    /// draw is uniform. `weights` must be non-empty.
    pub fn weighted_index(&mut self, weights: &[f32]) -> usize {
        let clamped = weights.iter().map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
        match WeightedIndex::<f32>::new(clamped) {
            Ok(dist) => dist.sample(&mut self.rng),
            Err(_) => self.index(weights.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = EvolutionRng::new(7);
        let mut b = EvolutionRng::new(7);
        for _ in 0..16 {
            assert_eq!(a.index(1000), b.index(1000));
            assert_eq!(a.chance(0.5), b.chance(0.5));
        }
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = EvolutionRng::new(1);
        for _ in 0..100 {
            assert_eq!(rng.weighted_index(&[0.0, 3.0, 0.0]), 1);
        }
    }

    #[test]
    fn test_weighted_index_uniform_fallback() {
        let mut rng = EvolutionRng::new(2);
        let mut seen = [false; 3];
        for _ in 0..200 {
            seen[rng.weighted_index(&[0.0, -1.0, 0.0])] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_symbol_from_alphabet() {
        let mut rng = EvolutionRng::new(3);
        let alphabet = ['A', 'C'];
        for _ in 0..50 {
            assert!(alphabet.contains(&rng.symbol(&alphabet)));
        }
    }
}
