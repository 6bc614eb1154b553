//! Bootstrap resampling for bagged models.
//!
//! Each tree of the forest draws its own bootstrap sample from an RNG seeded
//! by a counter-based PRF, so the result of a fit depends only on the base
//! seed and the tree index, never on thread scheduling.

use rand::Rng;

/// Counter-based RNG seed generation using SplitMix64.
///
/// Stateless PRF producing well-distributed seeds from a base seed and a
/// counter. Using this instead of `base_seed + counter` avoids sequential
/// correlation between neighbouring streams.
#[inline]
pub fn counter_rng_seed(base_seed: u64, counter: u64) -> u64 {
    // SplitMix64, see https://xoshiro.di.unimi.it/splitmix64.c
    let mut z = base_seed.wrapping_add(counter.wrapping_mul(0x9e3779b97f4a7c15));
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Draw `m` indices uniformly with replacement from `0..n` into `out`.
///
/// `out` is cleared first. Draws nothing when `n == 0`.
pub fn bootstrap_indices_into<R: Rng>(n: usize, m: usize, rng: &mut R, out: &mut Vec<usize>) {
    out.clear();
    if n == 0 {
        return;
    }
    out.extend((0..m).map(|_| rng.random_range(0..n)));
}

/// Allocating version of [`bootstrap_indices_into`].
pub fn bootstrap_indices<R: Rng>(n: usize, m: usize, rng: &mut R) -> Vec<usize> {
    let mut out = Vec::with_capacity(m);
    bootstrap_indices_into(n, m, rng, &mut out);
    out
}

/// Indices in `0..n` that never appear in `drawn` (out-of-bag samples).
pub fn out_of_bag(n: usize, drawn: &[usize]) -> Vec<usize> {
    let mut seen = vec![false; n];
    for &i in drawn {
        if i < n {
            seen[i] = true;
        }
    }
    seen.iter()
        .enumerate()
        .filter_map(|(i, &s)| (!s).then_some(i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_counter_seed_distinct() {
        let a = counter_rng_seed(42, 0);
        let b = counter_rng_seed(42, 1);
        let c = counter_rng_seed(43, 0);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, counter_rng_seed(42, 0));
    }

    #[test]
    fn test_bootstrap_indices_in_range() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let idx = bootstrap_indices(10, 50, &mut rng);
        assert_eq!(idx.len(), 50);
        assert!(idx.iter().all(|&i| i < 10));
    }

    #[test]
    fn test_bootstrap_deterministic_for_seed() {
        let mut a = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(1, 3));
        let mut b = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(1, 3));
        assert_eq!(
            bootstrap_indices(100, 100, &mut a),
            bootstrap_indices(100, 100, &mut b)
        );
    }

    #[test]
    fn test_empty_population() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        assert!(bootstrap_indices(0, 5, &mut rng).is_empty());
    }

    #[test]
    fn test_out_of_bag_complement() {
        let oob = out_of_bag(5, &[0, 0, 2, 4]);
        assert_eq!(oob, vec![1, 3]);
    }
}
