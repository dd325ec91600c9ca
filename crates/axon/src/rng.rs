//! RNG trait abstraction for network construction and mutation
//!
//! The engine never reaches for a global random source. Every operation that
//! draws randomness takes the generator as an argument, so callers can use:
//! - `rand::rng()` for live play
//! - a seeded `rand_xoshiro` generator for reproducible training runs and tests

use std::ops::Range;

use rand_distr::{Distribution, StandardNormal};

/// Random draws needed by the network engine
pub trait MutationRng {
    /// Generate random f32 in [0.0, 1.0)
    fn gen_f32(&mut self) -> f32;

    /// Generate a fresh connection weight in [-1.0, 1.0]
    fn unit_weight(&mut self) -> f32;

    /// Signed bell-shaped perturbation with standard deviation `scale`
    fn bell_delta(&mut self, scale: f32) -> f32;

    /// Uniform index in `range`; the range must not be empty
    fn pick_index(&mut self, range: Range<usize>) -> usize;

    /// Check if random value is less than probability threshold
    fn check_probability(&mut self, probability: f32) -> bool {
        self.gen_f32() < probability
    }

    /// Fair coin
    fn coin_flip(&mut self) -> bool {
        self.gen_f32() < 0.5
    }
}

// Covers ThreadRng as well as the seeded generators used in tests
impl<T: ?Sized + rand::Rng> MutationRng for T {
    fn gen_f32(&mut self) -> f32 {
        rand::Rng::random::<f32>(self)
    }

    fn unit_weight(&mut self) -> f32 {
        rand::Rng::random_range(self, -1.0..=1.0)
    }

    fn bell_delta(&mut self, scale: f32) -> f32 {
        let z: f32 = StandardNormal.sample(self);
        z * scale
    }

    fn pick_index(&mut self, range: Range<usize>) -> usize {
        debug_assert!(!range.is_empty(), "pick_index on empty range");
        rand::Rng::random_range(self, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_unit_weight_bounds() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12345);

        let mut seen_negative = false;
        let mut seen_positive = false;
        for _ in 0..1000 {
            let w = rng.unit_weight();
            assert!((-1.0..=1.0).contains(&w));
            seen_negative |= w < 0.0;
            seen_positive |= w > 0.0;
        }

        assert!(seen_negative);
        assert!(seen_positive);
    }

    #[test]
    fn test_check_probability_extremes() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(12345);

        for _ in 0..100 {
            assert!(rng.check_probability(1.0));
            assert!(!rng.check_probability(0.0));
        }
    }

    #[test]
    fn test_bell_delta_is_centered() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);

        let n = 5000;
        let mean: f32 = (0..n).map(|_| rng.bell_delta(1.0)).sum::<f32>() / n as f32;
        assert!(mean.abs() < 0.1, "mean drifted: {mean}");

        // Zero scale never moves anything
        assert_eq!(rng.bell_delta(0.0), 0.0);
    }

    #[test]
    fn test_pick_index_in_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(99);

        let mut seen = [false; 3];
        for _ in 0..200 {
            let i = rng.pick_index(1..4);
            assert!((1..4).contains(&i));
            seen[i - 1] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let mut rng1 = Xoshiro256PlusPlus::seed_from_u64(42);
        let mut rng2 = Xoshiro256PlusPlus::seed_from_u64(42);

        for _ in 0..100 {
            assert_eq!(rng1.unit_weight(), rng2.unit_weight());
            assert_eq!(rng1.bell_delta(0.5), rng2.bell_delta(0.5));
            assert_eq!(rng1.coin_flip(), rng2.coin_flip());
        }
    }
}
