//! Particle types and the read-only interface to partitioned particle collections
//!
//! The export pipeline never owns simulation state. It only requires read access to the particles
//! of the local partition through the [`ParticleSource`] trait and per-particle access through the
//! [`ParticleAccess`] capability trait.

use nalgebra::Vector3;

use crate::{Aabb3d, Real};

/// Read-only access to the data of a single particle
pub trait ParticleAccess<R: Real> {
    /// Position of the particle in lattice/simulation units
    fn position(&self) -> &Vector3<R>;
    /// Integer tag of the particle, used as generic label or as the index of a mesh vertex
    fn tag(&self) -> i64;
    /// Returns the scalar attribute stored in the given slot, if the particle carries it
    fn scalar(&self, slot: usize) -> Option<R>;
    /// Returns the vector attribute stored in the given slot, if the particle carries it
    fn vector(&self, slot: usize) -> Option<Vector3<R>>;
}

/// Read-only access to the local partition of a (possibly distributed) particle collection
pub trait ParticleSource<R: Real> {
    type Particle: ParticleAccess<R>;

    /// The bounding box of the whole collection, identical on all participants
    fn bounding_box(&self) -> &Aabb3d<R>;
    /// The particles stored in the partition of the calling participant
    fn local_particles(&self) -> &[Self::Particle];
}

/// Default particle type with a position, a tag and indexed scalar and vector attributes
#[derive(Clone, Debug, PartialEq)]
pub struct Particle<R: Real> {
    pub position: Vector3<R>,
    pub tag: i64,
    /// Scalar attributes, indexed by slot
    pub scalars: Vec<R>,
    /// Vector attributes, indexed by slot
    pub vectors: Vec<Vector3<R>>,
}

impl<R: Real> Particle<R> {
    /// Creates a particle without any attributes
    pub fn new(position: Vector3<R>, tag: i64) -> Self {
        Self {
            position,
            tag,
            scalars: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Replaces the scalar attributes of the particle
    pub fn with_scalars(mut self, scalars: Vec<R>) -> Self {
        self.scalars = scalars;
        self
    }

    /// Replaces the vector attributes of the particle
    pub fn with_vectors(mut self, vectors: Vec<Vector3<R>>) -> Self {
        self.vectors = vectors;
        self
    }
}

impl<R: Real> ParticleAccess<R> for Particle<R> {
    #[inline(always)]
    fn position(&self) -> &Vector3<R> {
        &self.position
    }

    #[inline(always)]
    fn tag(&self) -> i64 {
        self.tag
    }

    #[inline(always)]
    fn scalar(&self, slot: usize) -> Option<R> {
        self.scalars.get(slot).copied()
    }

    #[inline(always)]
    fn vector(&self, slot: usize) -> Option<Vector3<R>> {
        self.vectors.get(slot).copied()
    }
}

impl<R: Real, P: ParticleAccess<R>> ParticleAccess<R> for &P {
    fn position(&self) -> &Vector3<R> {
        (**self).position()
    }

    fn tag(&self) -> i64 {
        (**self).tag()
    }

    fn scalar(&self, slot: usize) -> Option<R> {
        (**self).scalar(slot)
    }

    fn vector(&self, slot: usize) -> Option<Vector3<R>> {
        (**self).vector(slot)
    }
}

/// An ordered set of particles confined to a spatial domain
///
/// A collection either represents the local partition of a distributed collection (then its domain
/// is the bounding box of the whole distributed collection) or a consolidated single-partition copy.
#[derive(Clone, Debug)]
pub struct ParticleCollection<R: Real, P = Particle<R>> {
    domain: Aabb3d<R>,
    particles: Vec<P>,
}

impl<R: Real, P> ParticleCollection<R, P> {
    /// Creates an empty collection covering the given domain
    pub fn new(domain: Aabb3d<R>) -> Self {
        Self {
            domain,
            particles: Vec::new(),
        }
    }

    /// Creates a collection covering the given domain from the given particles
    pub fn from_particles(domain: Aabb3d<R>, particles: Vec<P>) -> Self {
        Self { domain, particles }
    }

    /// The spatial domain of the collection
    pub fn domain(&self) -> &Aabb3d<R> {
        &self.domain
    }

    /// All particles of the collection in storage order
    pub fn particles(&self) -> &[P] {
        self.particles.as_slice()
    }

    /// Number of particles in the collection
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns whether the collection does not contain any particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Appends a particle to the end of the collection
    pub fn push(&mut self, particle: P) {
        self.particles.push(particle);
    }

    /// Consumes the collection and returns its particles
    pub fn into_particles(self) -> Vec<P> {
        self.particles
    }
}

impl<R: Real, P> Extend<P> for ParticleCollection<R, P> {
    fn extend<T: IntoIterator<Item = P>>(&mut self, iter: T) {
        self.particles.extend(iter);
    }
}

impl<R: Real, P: ParticleAccess<R>> ParticleSource<R> for ParticleCollection<R, P> {
    type Particle = P;

    fn bounding_box(&self) -> &Aabb3d<R> {
        &self.domain
    }

    fn local_particles(&self) -> &[P] {
        self.particles.as_slice()
    }
}
