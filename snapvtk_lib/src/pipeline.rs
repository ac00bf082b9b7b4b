//! Collective export functions operating on distributed particle collections
//!
//! Every function in this module is a collective operation: it has to be called by all
//! participants of the communicator with the same parameters. The local partitions are first
//! consolidated on the coordinator, which then locates the particles and writes the output file.
//! All other participants return after contributing their particles to the gather and never touch
//! the output path.

use std::path::Path;

use log::{debug, info};
use rand::Rng;

use crate::boundary::{MeshSelection, TriangleBoundary3d};
use crate::collector::consolidate;
use crate::comm::Communicator;
use crate::locator::find_particles;
use crate::particles::{ParticleCollection, ParticleSource};
use crate::selection::{TagPredicate, filter_particles};
use crate::writers::particle_vtk::write_particle_cloud;
use crate::writers::{
    CloudExportParameters, SurfaceExportParameters, TableExportParameters, write_ascii_positions,
    write_ascii_table, write_particle_cloud_vtk, write_vertex_vtk,
};
use crate::{Aabb3d, ExportError, Real, profile};

/// Consolidates the whole collection and returns it on the coordinator
fn consolidate_all<R, S, C>(
    comm: &C,
    particles: &S,
) -> Result<Option<ParticleCollection<R, S::Particle>>, ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
{
    let consolidated = consolidate(comm, particles, particles.bounding_box())?;
    if consolidated.is_none() {
        debug!(
            "Participant {} contributed its particles to the export and is done.",
            comm.rank()
        );
    }
    Ok(consolidated)
}

/// Writes the particles attached to the vertices of the boundary as legacy VTK surface mesh
///
/// The factor lists of the parameters are validated on every participant before the gather, so an
/// invalid request fails everywhere without any communication. See [`write_vertex_vtk`] for the
/// mapping of particles to vertices and the file layout.
pub fn write_surface_vtk<R, S, C, P>(
    comm: &C,
    particles: &S,
    boundary: &mut TriangleBoundary3d<R>,
    params: &SurfaceExportParameters<R>,
    path: P,
) -> Result<(), ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
    P: AsRef<Path>,
{
    profile!("write_surface_vtk");
    params.validate()?;

    if let Some(consolidated) = consolidate_all(comm, particles)? {
        let found = find_particles(&consolidated, consolidated.domain());
        write_vertex_vtk(&found, boundary, params, path)?;
    }
    Ok(())
}

/// Writes all particles of the collection (or a random sample of them) as legacy VTK point cloud
///
/// Returns the number of written particles on the coordinator and `None` on all other
/// participants. Use [`CloudExportParameters::default`] to write the velocity (vector slot `0`) of
/// all particles.
pub fn write_particle_vtk<R, S, C, G, P>(
    comm: &C,
    particles: &S,
    params: &CloudExportParameters,
    rng: &mut G,
    path: P,
) -> Result<Option<usize>, ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
    G: Rng + ?Sized,
    P: AsRef<Path>,
{
    profile!("write_particle_vtk");

    match consolidate_all(comm, particles)? {
        Some(consolidated) => {
            let found = find_particles(&consolidated, consolidated.domain());
            let written = write_particle_cloud_vtk::<R, _, _, _>(&found, params, rng, path)?;
            Ok(Some(written))
        }
        None => Ok(None),
    }
}

/// Writes all particles inside of `domain` whose tag matches the predicate as legacy VTK point cloud
///
/// The particles are filtered on every participant before the gather, so only the selected
/// particles are communicated. The selection is never sampled, `max_count` and `sampling` of the
/// parameters are ignored.
pub fn write_selected_particle_vtk<R, S, C, T, P>(
    comm: &C,
    particles: &S,
    domain: &Aabb3d<R>,
    predicate: &T,
    params: &CloudExportParameters,
    path: P,
) -> Result<Option<usize>, ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
    T: TagPredicate + ?Sized,
    P: AsRef<Path>,
{
    profile!("write_selected_particle_vtk");

    let selected = filter_particles(particles, domain, predicate);
    match consolidate(comm, &selected, domain)? {
        Some(consolidated) => {
            let found = find_particles(&consolidated, consolidated.domain());
            write_particle_cloud::<R, _>(&found, params, path.as_ref())?;
            info!("Wrote {} selected particles.", found.len());
            Ok(Some(found.len()))
        }
        None => Ok(None),
    }
}

/// Writes the particles attached to the vertices of the boundary as plain text table
///
/// In contrast to [`write_surface_vtk`] the number of particles has to match the number of
/// vertices of the selected mesh exactly. The rows are written in the order of the consolidated
/// particles with their raw positions.
pub fn write_vertex_ascii_data<R, S, C, P>(
    comm: &C,
    particles: &S,
    boundary: &mut TriangleBoundary3d<R>,
    params: &TableExportParameters<R>,
    dynamic_mesh: bool,
    path: P,
) -> Result<(), ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
    P: AsRef<Path>,
{
    profile!("write_vertex_ascii_data");
    params.validate()?;

    if let Some(consolidated) = consolidate_all(comm, particles)? {
        let found = find_particles(&consolidated, consolidated.domain());

        let boundary = boundary.select(MeshSelection::open(dynamic_mesh));
        let num_vertices = boundary.mesh().num_vertices();
        if found.len() != num_vertices {
            return Err(ExportError::VertexCountMismatch {
                num_particles: found.len(),
                num_vertices,
            });
        }

        write_ascii_table(&found, params, path)?;
    }
    Ok(())
}

/// Writes the positions of all particles as comma separated `x,y,z` lines
pub fn write_ascii_particle_pos<R, S, C, P>(
    comm: &C,
    particles: &S,
    path: P,
) -> Result<(), ExportError>
where
    R: Real,
    S: ParticleSource<R>,
    S::Particle: Clone + Send + 'static,
    C: Communicator,
    P: AsRef<Path>,
{
    profile!("write_ascii_particle_pos");

    if let Some(consolidated) = consolidate_all(comm, particles)? {
        let found = find_particles(&consolidated, consolidated.domain());
        write_ascii_positions::<R, _, _>(&found, path)?;
    }
    Ok(())
}
