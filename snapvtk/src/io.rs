//! Loading of particle snapshots and boundary meshes, the file format is detected from the extension

use anyhow::{Context, anyhow};
use log::info;
use snapvtk_lib::io::{json_format, vtk_format, xyz_format};
use snapvtk_lib::nalgebra::Vector3;
use snapvtk_lib::{Particle, Real, TriangleBoundary3d, profile};
use std::path::Path;

/// Returns the lower case extension of the file
fn extension_of(file: &Path) -> Result<String, anyhow::Error> {
    let extension = file
        .extension()
        .ok_or_else(|| {
            anyhow!(
                "Unable to detect file format of \"{}\" (file name has to end with a supported extension)",
                file.display()
            )
        })?
        .to_str()
        .ok_or_else(|| anyhow!("Invalid extension of file \"{}\"", file.display()))?;
    Ok(extension.to_lowercase())
}

/// Particles of formats without tags are tagged with their index in the file
fn tag_by_index<R: Real>(positions: Vec<Vector3<R>>) -> Vec<Particle<R>> {
    positions
        .into_iter()
        .enumerate()
        .map(|(i, position)| Particle::new(position, i as i64))
        .collect()
}

/// Loads the particles of a snapshot from the given file path, automatically detects the file format
pub fn read_particles<R: Real, P: AsRef<Path>>(
    input_file: P,
) -> Result<Vec<Particle<R>>, anyhow::Error> {
    let input_file = input_file.as_ref();
    info!(
        "Reading particle dataset from \"{}\"...",
        input_file.display()
    );

    let particles = {
        profile!("loading particles");
        match extension_of(input_file)?.as_str() {
            "json" => json_format::particles_from_json(input_file)?,
            "vtk" => tag_by_index(vtk_format::particles_from_vtk(input_file)?),
            "xyz" => tag_by_index(xyz_format::particles_from_xyz(input_file)?),
            extension => {
                return Err(anyhow!(
                    "Unsupported file format extension \"{}\" for reading particles",
                    extension
                ));
            }
        }
    };

    info!(
        "Successfully read dataset with {} particles.",
        particles.len()
    );
    Ok(particles)
}

/// Loads a boundary mesh from the given file path, automatically detects the file format
///
/// Meshes from VTK files are interpreted in physical units (lattice spacing `1` and lattice origin at zero).
pub fn read_boundary<R: Real, P: AsRef<Path>>(
    input_file: P,
) -> Result<TriangleBoundary3d<R>, anyhow::Error> {
    let input_file = input_file.as_ref();
    info!("Reading boundary mesh from \"{}\"...", input_file.display());

    let boundary = {
        profile!("loading boundary");
        match extension_of(input_file)?.as_str() {
            "json" => json_format::boundary_from_json(input_file)?,
            "vtk" => {
                let mesh = vtk_format::triangle_mesh_from_vtk(input_file)?;
                TriangleBoundary3d::new(mesh, R::one(), Vector3::zeros())
                    .context("Invalid triangle mesh in VTK file")?
            }
            extension => {
                return Err(anyhow!(
                    "Unsupported file format extension \"{}\" for reading boundary meshes",
                    extension
                ));
            }
        }
    };

    info!(
        "Successfully read boundary mesh with {} vertices and {} triangles.",
        boundary.mesh().num_vertices(),
        boundary.mesh().triangles.len()
    );
    Ok(boundary)
}
