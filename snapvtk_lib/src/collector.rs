use log::{debug, info};

use crate::comm::Communicator;
use crate::particles::{ParticleAccess, ParticleCollection, ParticleSource};
use crate::{Aabb3d, ExportError, Real, profile};

/// Consolidates the partitions of a particle collection into a single-partition copy on the coordinator
///
/// This is a collective operation: every participant has to call it, even though only the
/// coordinator receives the consolidated collection. All other participants receive `None`.
/// The consolidated collection covers `bounding_box`, particles of the local partitions outside of
/// this box are not copied. The particles are ordered by the rank of the participant that
/// contributed them, followed by their order in the contributing partition.
pub fn consolidate<R, S, C>(
    comm: &C,
    source: &S,
    bounding_box: &Aabb3d<R>,
) -> Result<Option<ParticleCollection<R, S::Particle>>, ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
{
    profile!("consolidate");

    let local_particles = source.local_particles();
    let contribution = local_particles
        .iter()
        .filter(|p| bounding_box.contains_point_inclusive(p.position()))
        .cloned()
        .collect::<Vec<_>>();

    let num_outside = local_particles.len() - contribution.len();
    if num_outside > 0 {
        debug!(
            "Participant {}: {} of {} local particles are outside of the consolidation domain and are skipped.",
            comm.rank(),
            num_outside,
            local_particles.len()
        );
    }

    let gathered = comm.gather(contribution)?;

    Ok(gathered.map(|partitions| {
        let mut consolidated = ParticleCollection::new(bounding_box.clone());
        for partition in partitions {
            consolidated.extend(partition);
        }
        info!(
            "Consolidated {} particles from {} participant(s).",
            consolidated.len(),
            comm.size()
        );
        consolidated
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{SerialComm, ThreadComm};
    use crate::locator::find_particles;
    use crate::particles::Particle;
    use nalgebra::Vector3;

    fn unit_box() -> Aabb3d<f64> {
        Aabb3d::new(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0))
    }

    fn partition(rank: usize, n: usize) -> ParticleCollection<f64> {
        let particles = (0..n)
            .map(|i| {
                let x = (rank * n + i) as f64 / 100.0;
                Particle::new(Vector3::new(x, 0.5, 1.0), (rank * n + i) as i64)
            })
            .collect();
        ParticleCollection::from_particles(unit_box(), particles)
    }

    #[test]
    fn test_serial_consolidate_and_find_everything() {
        let local = partition(0, 10);
        let consolidated = consolidate(&SerialComm, &local, local.domain())
            .unwrap()
            .expect("the serial participant is the coordinator");

        let found = find_particles(&consolidated, consolidated.domain());
        assert_eq!(found.len(), 10);
        for (found, original) in found.iter().zip(local.particles()) {
            assert_eq!(found.position, original.position);
        }
    }

    #[test]
    fn test_consolidate_skips_particles_outside_of_box() {
        let mut local = partition(0, 3);
        local.push(Particle::new(Vector3::new(2.0, 0.0, 0.0), 99));

        let consolidated = consolidate(&SerialComm, &local, &unit_box())
            .unwrap()
            .unwrap();
        assert_eq!(consolidated.len(), 3);
        assert!(consolidated.particles().iter().all(|p| p.tag != 99));
    }

    #[test]
    fn test_threaded_consolidate() {
        let num_participants = 3;
        let per_participant = 5;
        let group = ThreadComm::create_group(num_participants);

        let results = std::thread::scope(|s| {
            let handles = group
                .into_iter()
                .map(|comm| {
                    s.spawn(move || {
                        let local = partition(comm.rank(), per_participant);
                        consolidate(&comm, &local, &unit_box()).unwrap()
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        let consolidated = results[0].as_ref().unwrap();
        assert!(results[1..].iter().all(Option::is_none));

        let found = find_particles(consolidated, consolidated.domain());
        assert_eq!(found.len(), num_participants * per_participant);
        let tags = found.iter().map(|p| p.tag).collect::<Vec<_>>();
        assert_eq!(tags, (0..15).collect::<Vec<i64>>());
    }
}
