//! Writers for the legacy VTK and plain text output formats
//!
//! All writers operate on particles already located on the coordinating participant. The
//! collective functions that consolidate a distributed collection before writing are found in
//! [`pipeline`](crate::pipeline).

pub mod ascii;
pub mod format;
pub mod particle_vtk;
pub mod surface_vtk;

pub use ascii::{TableExportParameters, write_ascii_positions, write_ascii_table};
pub use particle_vtk::{CloudExportParameters, write_particle_cloud_vtk};
pub use surface_vtk::{SurfaceExportParameters, write_vertex_vtk};

use crate::{AttributeKind, ExportError, ParticleAccess, Real};
use nalgebra::Vector3;

/// Checks that a list of scale factors is either empty or has one factor per attribute name
pub(crate) fn check_factor_count<R>(
    kind: AttributeKind,
    names: &[String],
    factors: &[R],
) -> Result<(), ExportError> {
    if factors.is_empty() || factors.len() == names.len() {
        Ok(())
    } else {
        Err(ExportError::FactorCountMismatch {
            kind,
            num_names: names.len(),
            num_factors: factors.len(),
        })
    }
}

/// Reads the scalar of the given slot from the particle and applies the optional scale factor
pub(crate) fn scaled_scalar<R: Real, P: ParticleAccess<R>>(
    particle: &P,
    slot: usize,
    factors: &[R],
) -> Result<R, ExportError> {
    let value = particle
        .scalar(slot)
        .ok_or_else(|| ExportError::MissingAttribute {
            kind: AttributeKind::Scalar,
            slot,
            tag: particle.tag(),
        })?;
    Ok(match factors.get(slot) {
        Some(&factor) => value * factor,
        None => value,
    })
}

/// Reads the vector of the given slot from the particle and applies the optional scale factor
pub(crate) fn scaled_vector<R: Real, P: ParticleAccess<R>>(
    particle: &P,
    slot: usize,
    factors: &[R],
) -> Result<Vector3<R>, ExportError> {
    let value = particle
        .vector(slot)
        .ok_or_else(|| ExportError::MissingAttribute {
            kind: AttributeKind::Vector,
            slot,
            tag: particle.tag(),
        })?;
    Ok(match factors.get(slot) {
        Some(&factor) => value * factor,
        None => value,
    })
}
