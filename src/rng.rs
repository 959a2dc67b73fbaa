//! Deterministic RNG and distributions used throughout the simulator.
//!
//! Grounded on `original_source/utility_functions.cpp`
//! (`uniform_distribution`, `exponential_distribution`, `choose_percent`,
//! `choose_neighbours_values`). The original reseeds a thread-local
//! `std::mt19937` from a single `global_seed`; this crate instead threads an
//! explicit `StdRng` through every call site, so two simulations built from
//! the same seed and fed the same sequence of calls are bit-for-bit
//! reproducible without relying on global state (spec.md §9).

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Exp};

pub type SimRng = rand::rngs::StdRng;

pub fn new_rng(seed: u64) -> SimRng {
    use rand::SeedableRng;
    SimRng::seed_from_u64(seed)
}

/// Uniform integer in `[min, max]` inclusive.
pub fn uniform_range(rng: &mut SimRng, min: i64, max: i64) -> i64 {
    rng.gen_range(min..=max)
}

/// Samples a discrete millisecond duration from an exponential distribution
/// with the given mean, matching
/// `std::exponential_distribution<double>(1.0/mean)` truncated to an
/// integer by the original.
pub fn exponential_ms(rng: &mut SimRng, mean: f64) -> u64 {
    if mean <= 0.0 {
        return 0;
    }
    let dist = Exp::new(1.0 / mean).expect("mean must be positive");
    dist.sample(rng).max(0.0) as u64
}

/// Selects `percent` (0.0..=1.0) of `[0, n)` without repetition, matching
/// `choose_percent`.
pub fn choose_percent(rng: &mut SimRng, n: usize, percent: f64) -> Vec<usize> {
    let count = (n as f64 * percent) as usize;
    choose_k_from(rng, &(0..n).collect::<Vec<_>>(), count, &[])
}

/// Selects `k` distinct values from `universe`, excluding any id in
/// `excluded`, matching `choose_neighbours_values`.
pub fn choose_k_from(rng: &mut SimRng, universe: &[usize], k: usize, excluded: &[usize]) -> Vec<usize> {
    let candidates: Vec<usize> = universe
        .iter()
        .copied()
        .filter(|c| !excluded.contains(c))
        .collect();
    let mut shuffled = candidates;
    shuffled.shuffle(rng);
    shuffled.into_iter().take(k).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_range_stays_in_bounds() {
        let mut rng = new_rng(1);
        for _ in 0..1000 {
            let v = uniform_range(&mut rng, 5, 20);
            assert!((5..=20).contains(&v));
        }
    }

    #[test]
    fn choose_percent_respects_count_and_uniqueness() {
        let mut rng = new_rng(42);
        let chosen = choose_percent(&mut rng, 20, 0.3);
        assert_eq!(chosen.len(), 6);
        let unique: std::collections::HashSet<_> = chosen.iter().collect();
        assert_eq!(unique.len(), chosen.len());
    }

    #[test]
    fn choose_k_from_excludes_given_ids() {
        let mut rng = new_rng(7);
        let universe: Vec<usize> = (0..10).collect();
        let chosen = choose_k_from(&mut rng, &universe, 3, &[0, 1, 2]);
        assert_eq!(chosen.len(), 3);
        assert!(chosen.iter().all(|c| *c >= 3));
    }

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut a = new_rng(99);
        let mut b = new_rng(99);
        let seq_a: Vec<i64> = (0..10).map(|_| uniform_range(&mut a, 0, 1000)).collect();
        let seq_b: Vec<i64> = (0..10).map(|_| uniform_range(&mut b, 0, 1000)).collect();
        assert_eq!(seq_a, seq_b);
    }
}
