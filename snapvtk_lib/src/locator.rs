use log::trace;

use crate::particles::{ParticleAccess, ParticleCollection};
use crate::{Aabb3d, Real, profile};

/// Returns references to all particles of the collection located inside of the given region
///
/// The region is treated as a closed box, i.e. particles on its faces are included. The particles
/// are returned in the storage order of the collection, each particle at most once.
pub fn find_particles<'a, R, P>(
    collection: &'a ParticleCollection<R, P>,
    region: &Aabb3d<R>,
) -> Vec<&'a P>
where
    R: Real,
    P: ParticleAccess<R>,
{
    profile!("find_particles");

    let found = collection
        .particles()
        .iter()
        .filter(|p| region.contains_point_inclusive(p.position()))
        .collect::<Vec<_>>();

    trace!(
        "Found {} of {} particles in region {:?}",
        found.len(),
        collection.len(),
        region
    );
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::Particle;
    use nalgebra::Vector3;

    #[test]
    fn test_find_particles_in_sub_region() {
        let domain = Aabb3d::new(Vector3::zeros(), Vector3::new(4.0, 4.0, 4.0));
        let particles = (0..5)
            .map(|i| Particle::new(Vector3::new(i as f32, 1.0, 1.0), i))
            .collect();
        let collection = ParticleCollection::from_particles(domain, particles);

        let region = Aabb3d::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(3.0, 2.0, 2.0));
        let found = find_particles(&collection, &region);
        assert_eq!(found.iter().map(|p| p.tag).collect::<Vec<_>>(), vec![1, 2, 3]);

        // Deterministic for repeated lookups
        let found_again = find_particles(&collection, &region);
        assert!(
            found
                .iter()
                .zip(found_again.iter())
                .all(|(a, b)| std::ptr::eq(*a, *b))
        );
    }
}
