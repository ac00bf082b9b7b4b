//!
//! Library for exporting snapshots of distributed particle data to legacy VTK and plain text files.
//!
//! The export pipeline gathers the partitions of a particle collection onto the coordinating
//! participant ([`collector`]), locates the particles of a region ([`locator`]), optionally filters
//! ([`selection`]) and samples ([`sampling`]) them and finally writes them with one of the
//! [`writers`]. The collective entry points combining these steps are found in [`pipeline`].
//!

/// Re-export the version of nalgebra used by this crate
pub use nalgebra;
/// Re-export the version of rand used by this crate
pub use rand;
/// Re-export the version of vtkio used by this crate, if io support is enabled
#[cfg(feature = "io")]
pub use vtkio;

mod aabb;
/// Triangle boundary meshes with a stack of mesh selections
pub mod boundary;
/// Consolidation of a partitioned particle collection on the coordinating participant
pub mod collector;
/// Collective communication between the participants of an export
pub mod comm;
/// Convenience functions for importing particles and boundary meshes from various file formats
#[cfg(feature = "io")]
pub mod io;
/// Spatial lookup of particles in a consolidated collection
pub mod locator;
mod numeric_types;
/// Particle data types and the particle source interface
pub mod particles;
/// Collective export entry points combining gather, lookup and writers
pub mod pipeline;
#[cfg(feature = "profiling")]
#[cfg_attr(docsrs, doc(cfg(feature = "profiling")))]
pub mod profiling;
#[doc(hidden)]
pub mod profiling_macro;
/// Random sub-sampling of particle sets
pub mod sampling;
/// Tag based particle selection
pub mod selection;
/// Writers for the legacy VTK and plain text output formats
pub mod writers;

use std::path::PathBuf;

use thiserror::Error as ThisError;

pub use aabb::Aabb3d;
pub use boundary::{
    BoundaryError, MeshMotion, MeshSelection, MeshTopology, SelectionGuard, TriMesh3d,
    TriangleBoundary3d,
};
pub use comm::{COORDINATOR_RANK, CommError, Communicator, SerialComm, ThreadComm};
pub use numeric_types::{Real, RealConvert, ThreadSafe};
pub use particles::{Particle, ParticleAccess, ParticleCollection, ParticleSource};
pub use sampling::SamplingStrategy;
pub use selection::{TagPredicate, TagSelection};

/// Error type returned when an export fails
#[derive(Debug, ThisError)]
pub enum ExportError {
    /// The list of scale factors has neither zero length nor the length of the list of attribute names
    #[error(
        "{kind} factor list has {num_factors} entries but {num_names} {kind} names were given (expected 0 or {num_names} factors)"
    )]
    FactorCountMismatch {
        kind: AttributeKind,
        num_names: usize,
        num_factors: usize,
    },
    /// A particle tag used as mesh vertex index does not refer to a vertex of the mesh
    #[error("particle tag {tag} is not a valid vertex index of a mesh with {num_vertices} vertices")]
    TagOutOfRange { tag: i64, num_vertices: usize },
    /// The number of particles has to match the number of mesh vertices for this export
    #[error("number of particles ({num_particles}) does not match number of mesh vertices ({num_vertices})")]
    VertexCountMismatch {
        num_particles: usize,
        num_vertices: usize,
    },
    /// A particle does not carry a requested attribute
    #[error("particle with tag {tag} has no {kind} attribute in slot {slot}")]
    MissingAttribute {
        kind: AttributeKind,
        slot: usize,
        tag: i64,
    },
    /// Errors of the communication layer during the collective gather
    #[error("communication between participants failed")]
    Communication(#[from] CommError),
    /// Errors while creating or writing an output file
    #[error("failed to write output file \"{}\"", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Kind of a particle attribute
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar,
    Vector,
}

impl std::fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeKind::Scalar => write!(f, "scalar"),
            AttributeKind::Vector => write!(f, "vector"),
        }
    }
}

impl ExportError {
    /// Constructs the error for a failed write to the file at the given path
    pub(crate) fn io<P: Into<PathBuf>>(path: P) -> impl FnOnce(std::io::Error) -> ExportError {
        let path = path.into();
        move |source| ExportError::Io { path, source }
    }
}
