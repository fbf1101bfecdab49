//! Seeded randomness.
//!
//! Every random decision in a DST run comes from one of these, so a run is
//! reproduced by its seed alone.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

/// Deterministic RNG wrapper.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: StdRng,
    seed: u64,
}

impl DeterministicRng {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this RNG was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.rng.gen_range(range)
    }

    /// True with probability `p` (clamped to `[0, 1]`).
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Independent child RNG, e.g. one per simulated thread.
    #[must_use]
    pub fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = DeterministicRng::new(12345);
        let mut b = DeterministicRng::new(12345);
        for _ in 0..100 {
            assert_eq!(a.gen_range(0..1000_u64), b.gen_range(0..1000_u64));
        }
    }

    #[test]
    fn test_forks_are_deterministic() {
        let mut a = DeterministicRng::new(7);
        let mut b = DeterministicRng::new(7);
        let mut fa = a.fork();
        let mut fb = b.fork();
        assert_eq!(fa.seed(), fb.seed());
        assert_eq!(fa.next_u64(), fb.next_u64());
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = DeterministicRng::new(3);
        let mut values: Vec<u64> = (0..50).collect();
        rng.shuffle(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
