//! Random sub-sampling of particle sets before writing them

use log::debug;
use rand::Rng;

use crate::profile;

/// Strategy used to draw the indices of a random sample
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SamplingStrategy {
    /// Draws indices independently, a particle may appear more than once in the sample
    ///
    /// Indices are drawn from `0..n-1`, so the last particle of the set is never part of a sample.
    #[default]
    WithReplacement,
    /// Draws distinct indices, every particle appears at most once in the sample
    WithoutReplacement,
}

/// Returns the number of particles written for a set of `num_particles` with the given limit
///
/// A limit of zero or a limit of at least `num_particles` keeps all particles.
pub fn effective_sample_size(num_particles: usize, max_count: usize) -> usize {
    if max_count == 0 || max_count >= num_particles {
        num_particles
    } else {
        max_count
    }
}

/// Draws the sorted indices of a random sample of size `sample_size` from a set of size `num_particles`
///
/// Returns `None` if the sample covers the whole set (see [`effective_sample_size`]), in this case
/// the set should be used as is without drawing any random numbers.
pub fn sample_indices<G: Rng + ?Sized>(
    num_particles: usize,
    sample_size: usize,
    strategy: SamplingStrategy,
    rng: &mut G,
) -> Option<Vec<usize>> {
    let sample_size = effective_sample_size(num_particles, sample_size);
    if sample_size == num_particles {
        return None;
    }

    profile!("sample_indices");
    debug!(
        "Drawing a random sample of {} out of {} particles ({:?}).",
        sample_size, num_particles, strategy
    );

    // Here 0 < sample_size < num_particles, so num_particles >= 2
    let mut indices = match strategy {
        SamplingStrategy::WithReplacement => (0..sample_size)
            .map(|_| rng.gen_range(0..num_particles - 1))
            .collect::<Vec<_>>(),
        SamplingStrategy::WithoutReplacement => {
            rand::seq::index::sample(rng, num_particles, sample_size).into_vec()
        }
    };
    indices.sort_unstable();
    Some(indices)
}

/// Returns a random sample of the given items with at most `max_count` entries in storage order
///
/// A `max_count` of zero or of at least the number of items returns all items unchanged.
pub fn sample<T: Clone, G: Rng + ?Sized>(
    items: &[T],
    max_count: usize,
    strategy: SamplingStrategy,
    rng: &mut G,
) -> Vec<T> {
    match sample_indices(items.len(), max_count, strategy, rng) {
        Some(indices) => indices.into_iter().map(|i| items[i].clone()).collect(),
        None => items.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_effective_sample_size() {
        assert_eq!(effective_sample_size(10, 0), 10);
        assert_eq!(effective_sample_size(10, 10), 10);
        assert_eq!(effective_sample_size(10, 25), 10);
        assert_eq!(effective_sample_size(10, 3), 3);
        assert_eq!(effective_sample_size(0, 3), 0);
    }

    #[test]
    fn test_sample_identity_without_limit() {
        let mut rng = StdRng::seed_from_u64(42);
        let items = (0..20).collect::<Vec<u32>>();
        assert_eq!(sample(&items, 0, SamplingStrategy::default(), &mut rng), items);
        assert_eq!(sample(&items, 20, SamplingStrategy::default(), &mut rng), items);
        assert_eq!(
            sample(&items, 100, SamplingStrategy::WithoutReplacement, &mut rng),
            items
        );
    }

    #[test]
    fn test_sample_with_replacement() {
        let mut rng = StdRng::seed_from_u64(7);
        let indices = sample_indices(10, 4, SamplingStrategy::WithReplacement, &mut rng).unwrap();
        assert_eq!(indices.len(), 4);
        assert!(indices.windows(2).all(|w| w[0] <= w[1]));
        assert!(indices.iter().all(|&i| i < 9));

        // Sampling a set of two particles may only ever pick the first one
        for _ in 0..10 {
            let indices =
                sample_indices(2, 1, SamplingStrategy::WithReplacement, &mut rng).unwrap();
            assert_eq!(indices, vec![0]);
        }
    }

    #[test]
    fn test_sample_without_replacement() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = (0..100).collect::<Vec<u32>>();
        let sampled = sample(&items, 30, SamplingStrategy::WithoutReplacement, &mut rng);
        assert_eq!(sampled.len(), 30);
        assert!(sampled.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_is_reproducible_with_seed() {
        let items = (0..50).collect::<Vec<u32>>();
        let a = sample(&items, 5, SamplingStrategy::WithReplacement, &mut StdRng::seed_from_u64(1));
        let b = sample(&items, 5, SamplingStrategy::WithReplacement, &mut StdRng::seed_from_u64(1));
        assert_eq!(a, b);
    }
}
