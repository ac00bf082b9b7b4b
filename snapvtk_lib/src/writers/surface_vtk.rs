//! Export of particles attached to the vertices of a boundary mesh as legacy VTK surface mesh

use std::io::{self, Write};
use std::path::Path;

use log::{info, warn};
use nalgebra::Vector3;

use super::format::{create_output_file, vtk_real_type};
use super::{check_factor_count, scaled_scalar, scaled_vector};
use crate::boundary::{MeshSelection, TriMesh3d, TriangleBoundary3d};
use crate::{AttributeKind, ExportError, ParticleAccess, Real, profile};

/// Parameters of a surface mesh export
#[derive(Clone, Debug)]
pub struct SurfaceExportParameters<R: Real> {
    /// Names of the scalar attributes to write, the `i`-th name refers to scalar slot `i`
    pub scalar_names: Vec<String>,
    /// Names of the vector attributes to write, the `i`-th name refers to vector slot `i`
    pub vector_names: Vec<String>,
    /// Scale factors of the scalar attributes, either empty or one per scalar name
    pub scalar_factors: Vec<R>,
    /// Scale factors of the vector attributes, either empty or one per vector name
    pub vector_factors: Vec<R>,
    /// Whether to use the current (dynamic) vertex positions of the boundary instead of the static ones
    pub dynamic_mesh: bool,
    /// Only triangles with this region tag are written as cells, all triangles if negative
    pub region_tag: i64,
}

impl<R: Real> Default for SurfaceExportParameters<R> {
    fn default() -> Self {
        Self {
            scalar_names: Vec::new(),
            vector_names: Vec::new(),
            scalar_factors: Vec::new(),
            vector_factors: Vec::new(),
            dynamic_mesh: false,
            region_tag: -1,
        }
    }
}

impl<R: Real> SurfaceExportParameters<R> {
    /// Parameters writing the given attributes unscaled on the static mesh with all triangles
    pub fn new<S: Into<String>>(
        scalar_names: impl IntoIterator<Item = S>,
        vector_names: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            scalar_names: scalar_names.into_iter().map(Into::into).collect(),
            vector_names: vector_names.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_factors(mut self, scalar_factors: Vec<R>, vector_factors: Vec<R>) -> Self {
        self.scalar_factors = scalar_factors;
        self.vector_factors = vector_factors;
        self
    }

    pub fn with_dynamic_mesh(mut self, dynamic_mesh: bool) -> Self {
        self.dynamic_mesh = dynamic_mesh;
        self
    }

    pub fn with_region_tag(mut self, region_tag: i64) -> Self {
        self.region_tag = region_tag;
        self
    }

    /// Checks that the factor lists are either empty or match the lengths of the name lists
    pub fn validate(&self) -> Result<(), ExportError> {
        check_factor_count(AttributeKind::Scalar, &self.scalar_names, &self.scalar_factors)?;
        check_factor_count(AttributeKind::Vector, &self.vector_names, &self.vector_factors)?;
        Ok(())
    }

    /// The mesh selection used by exports with these parameters
    pub fn mesh_selection(&self) -> MeshSelection {
        MeshSelection::open(self.dynamic_mesh)
    }
}

/// Per-vertex data of a surface export, vertices without particle stay zero
struct VertexData<R: Real> {
    positions: Vec<Vector3<R>>,
    scalars: Vec<Vec<R>>,
    vectors: Vec<Vec<Vector3<R>>>,
}

impl<R: Real> VertexData<R> {
    fn zeros(num_vertices: usize, num_scalars: usize, num_vectors: usize) -> Self {
        Self {
            positions: vec![Vector3::zeros(); num_vertices],
            scalars: vec![vec![R::zero(); num_vertices]; num_scalars],
            vectors: vec![vec![Vector3::zeros(); num_vertices]; num_vectors],
        }
    }
}

/// Maps the particles to the vertices of the currently selected mesh using their tags as vertex index
fn collect_vertex_data<R: Real, P: ParticleAccess<R>>(
    particles: &[P],
    boundary: &TriangleBoundary3d<R>,
    params: &SurfaceExportParameters<R>,
) -> Result<VertexData<R>, ExportError> {
    let num_vertices = boundary.mesh().num_vertices();
    let mut data = VertexData::zeros(
        num_vertices,
        params.scalar_names.len(),
        params.vector_names.len(),
    );

    for particle in particles {
        let tag = particle.tag();
        let vertex = usize::try_from(tag)
            .ok()
            .filter(|&v| v < num_vertices)
            .ok_or(ExportError::TagOutOfRange { tag, num_vertices })?;

        data.positions[vertex] = boundary.to_physical(particle.position());
        for (slot, values) in data.scalars.iter_mut().enumerate() {
            values[vertex] = scaled_scalar(particle, slot, &params.scalar_factors)?;
        }
        for (slot, values) in data.vectors.iter_mut().enumerate() {
            values[vertex] = scaled_vector(particle, slot, &params.vector_factors)?;
        }
    }

    Ok(data)
}

/// Writes the particles located at the vertices of a boundary mesh to a legacy VTK unstructured grid file
///
/// Every particle is mapped to the mesh vertex given by its tag. The selection of the boundary is
/// switched to the open mesh (static or dynamic according to the parameters) for the duration of
/// the call and restored afterwards on every path. The file contains the physical position of every
/// vertex, the triangles with the requested region tag as cells and the requested attributes as
/// point data. Vertices without a particle are written with zero position and attributes, a
/// mismatch between the number of particles and vertices is only reported as a warning.
///
/// Invalid factor lists, tags that are not a vertex index and missing attributes are reported
/// before the output file is created.
pub fn write_vertex_vtk<R: Real, P: ParticleAccess<R>, Pth: AsRef<Path>>(
    particles: &[P],
    boundary: &mut TriangleBoundary3d<R>,
    params: &SurfaceExportParameters<R>,
    path: Pth,
) -> Result<(), ExportError> {
    profile!("write_vertex_vtk");
    let path = path.as_ref();

    params.validate()?;
    let boundary = boundary.select(params.mesh_selection());

    let mesh = boundary.mesh();
    if particles.len() != mesh.num_vertices() {
        warn!(
            "The number of particles ({}) does not match the number of mesh vertices ({}). Vertices without particle are written with zero data.",
            particles.len(),
            mesh.num_vertices()
        );
    }

    let data = collect_vertex_data(particles, &boundary, params)?;

    let mut writer = create_output_file(path)?;
    write_surface_data(&mut writer, mesh, &data, params)
        .and_then(|_| writer.flush())
        .map_err(ExportError::io(path))?;

    info!(
        "Wrote surface mesh with {} vertices to \"{}\".",
        mesh.num_vertices(),
        path.display()
    );
    Ok(())
}

fn write_surface_data<W: Write, R: Real>(
    writer: &mut W,
    mesh: &TriMesh3d<R>,
    data: &VertexData<R>,
    params: &SurfaceExportParameters<R>,
) -> io::Result<()> {
    let real_type = vtk_real_type::<R>();
    let num_vertices = mesh.num_vertices();

    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "Surface mesh exported by snapvtk")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(writer, "POINTS {} {}", num_vertices, real_type)?;
    for p in &data.positions {
        writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
    }
    writeln!(writer)?;

    let cells = mesh
        .triangles_with_tag(params.region_tag)
        .collect::<Vec<_>>();
    writeln!(writer, "CELLS {} {}", cells.len(), 4 * cells.len())?;
    for [i0, i1, i2] in cells.iter().copied() {
        writeln!(writer, "3 {} {} {}", i0, i1, i2)?;
    }
    writeln!(writer)?;

    writeln!(writer, "CELL_TYPES {}", cells.len())?;
    for _ in 0..cells.len() {
        writeln!(writer, "5")?;
    }
    writeln!(writer)?;

    writeln!(writer, "POINT_DATA {}", num_vertices)?;
    for (name, values) in params.vector_names.iter().zip(&data.vectors) {
        writeln!(writer, "VECTORS {} {}", name, real_type)?;
        for v in values {
            writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(writer)?;
    }
    for (name, values) in params.scalar_names.iter().zip(&data.scalars) {
        writeln!(writer, "SCALARS {} {} 1", name, real_type)?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for s in values {
            writeln!(writer, "{}", s)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}
