//! Selection of particles by their tag

use std::ops::RangeInclusive;

use log::debug;

use crate::particles::{ParticleAccess, ParticleCollection, ParticleSource};
use crate::{Aabb3d, Real, profile};

/// Predicate over particle tags deciding whether a particle is part of a selection
pub trait TagPredicate {
    fn matches(&self, tag: i64) -> bool;
}

impl<F: Fn(i64) -> bool> TagPredicate for F {
    fn matches(&self, tag: i64) -> bool {
        self(tag)
    }
}

/// Commonly used tag predicates
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TagSelection {
    /// Selects every particle
    #[default]
    All,
    /// Selects particles with exactly the given tag
    Equal(i64),
    /// Selects particles with any of the given tags
    OneOf(Vec<i64>),
    /// Selects particles with a tag in the given inclusive range
    Range(RangeInclusive<i64>),
    /// Selects particles with a tag strictly greater than the given value
    Above(i64),
    /// Selects particles with a tag strictly less than the given value
    Below(i64),
}

impl TagPredicate for TagSelection {
    fn matches(&self, tag: i64) -> bool {
        match self {
            TagSelection::All => true,
            TagSelection::Equal(t) => tag == *t,
            TagSelection::OneOf(tags) => tags.contains(&tag),
            TagSelection::Range(range) => range.contains(&tag),
            TagSelection::Above(t) => tag > *t,
            TagSelection::Below(t) => tag < *t,
        }
    }
}

/// Copies all particles of the source located in `domain` and matching the predicate into a new collection
///
/// Only the local partition of the source is visited and `domain` is treated as a closed box. The
/// domain of the returned collection is the bounding box of the source and the relative order of
/// the copied particles is preserved.
pub fn filter_particles<R, S, T>(
    source: &S,
    domain: &Aabb3d<R>,
    predicate: &T,
) -> ParticleCollection<R, S::Particle>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone,
    T: TagPredicate + ?Sized,
{
    profile!("filter_particles");

    let local_particles = source.local_particles();
    let selected = local_particles
        .iter()
        .filter(|p| domain.contains_point_inclusive(p.position()) && predicate.matches(p.tag()))
        .cloned()
        .collect::<Vec<_>>();

    debug!(
        "Selected {} of {} local particles by tag.",
        selected.len(),
        local_particles.len()
    );

    ParticleCollection::from_particles(source.bounding_box().clone(), selected)
}
