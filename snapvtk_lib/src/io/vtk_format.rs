//! Helper functions for reading input data from VTK files

use crate::boundary::TriMesh3d;
use crate::io::io_utils::{self, IteratorExt};
use crate::{Real, profile};
use anyhow::{Context, anyhow};
use nalgebra::Vector3;
use std::borrow::Cow;
use std::path::Path;
use vtkio::IOBuffer;
use vtkio::model::{DataSet, PolyDataPiece, UnstructuredGridPiece, VertexNumbers, Vtk};

/// A loaded piece of a VTK file that is supported as input
pub enum DataPiece {
    UnstructuredGrid(UnstructuredGridPiece),
    PolyData(PolyDataPiece),
}

impl DataPiece {
    fn points(&self) -> &IOBuffer {
        match self {
            DataPiece::UnstructuredGrid(p) => &p.points,
            DataPiece::PolyData(p) => &p.points,
        }
    }

    /// Tries to load the point coordinates of this piece
    pub fn load_points<R: Real>(&self) -> Result<Vec<Vector3<R>>, anyhow::Error> {
        match self.points() {
            IOBuffer::F64(coords) => points_from_coords(coords),
            IOBuffer::F32(coords) => points_from_coords(coords),
            _ => Err(anyhow!(
                "Point coordinate IOBuffer does not contain f32 or f64 values"
            )),
        }
    }

    /// Tries to load a triangle mesh from this piece, all triangles get the region tag `0`
    pub fn load_as_triangle_mesh<R: Real>(&self) -> Result<TriMesh3d<R>, anyhow::Error> {
        match self {
            DataPiece::UnstructuredGrid(p) => {
                let vertices = self.load_points()?;
                let triangles = triangles_from_vertex_numbers(&p.cells.cell_verts)?;
                Ok(TriMesh3d::new(vertices, triangles))
            }
            DataPiece::PolyData(_) => Err(anyhow!(
                "Unsupported piece type for loading triangle meshes (expected unstructured grid)"
            )),
        }
    }
}

/// Tries to read the given VTK file and loads all its supported pieces
pub fn read_vtk_pieces<P: AsRef<Path>>(filename: P) -> Result<Vec<DataPiece>, anyhow::Error> {
    profile!("read_vtk_pieces");
    let filename = filename.as_ref();
    let mut vtk_file = Vtk::import(filename)
        .with_context(|| anyhow!("Failed to load VTK file \"{}\"", filename.display()))?;
    vtk_file.load_all_pieces()?;

    let file_path = vtk_file.file_path.as_deref();
    let pieces = match vtk_file.data {
        DataSet::UnstructuredGrid { pieces, .. } => pieces
            .into_iter()
            .map(|p| p.into_loaded_piece_data(file_path))
            .map(|p| p.map(DataPiece::UnstructuredGrid))
            .collect::<Result<Vec<_>, _>>()?,
        DataSet::PolyData { pieces, .. } => pieces
            .into_iter()
            .map(|p| p.into_loaded_piece_data(file_path))
            .map(|p| p.map(DataPiece::PolyData))
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(anyhow!(
                "VTK file does not contain supported data set pieces"
            ));
        }
    };

    Ok(pieces)
}

fn first_piece(file_path: &Path) -> Result<DataPiece, anyhow::Error> {
    read_vtk_pieces(file_path)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            anyhow!(
                "No supported pieces in VTK file \"{}\"",
                file_path.display()
            )
        })
}

/// Tries to read a set of particle positions from the VTK file at the given path
pub fn particles_from_vtk<R: Real, P: AsRef<Path>>(
    file_path: P,
) -> Result<Vec<Vector3<R>>, anyhow::Error> {
    first_piece(file_path.as_ref())?.load_points()
}

/// Tries to read a triangle mesh from the VTK file at the given path
pub fn triangle_mesh_from_vtk<R: Real, P: AsRef<Path>>(
    file_path: P,
) -> Result<TriMesh3d<R>, anyhow::Error> {
    first_piece(file_path.as_ref())?.load_as_triangle_mesh()
}

/// Extracts the vertex indices of triangle cells, fails if there are any other cells
fn triangles_from_vertex_numbers(
    cell_verts: &VertexNumbers,
) -> Result<Vec<[usize; 3]>, anyhow::Error> {
    let (num_cells, cell_verts) = match cell_verts {
        VertexNumbers::Legacy {
            num_cells,
            vertices,
        } => (*num_cells, Cow::Borrowed(vertices)),
        xml @ VertexNumbers::XML { .. } => {
            let (num_cells, cell_verts) = xml.clone().into_legacy();
            (num_cells, Cow::Owned(cell_verts))
        }
    };

    if cell_verts.len() != 4 * num_cells as usize {
        return Err(anyhow!(
            "Length of cell vertex array is invalid. Expected 4 values per cell (3 for each triangle vertex index + 1 for vertex count). There are {} values for {} cells.",
            cell_verts.len(),
            num_cells
        ));
    }

    cell_verts
        .chunks_exact(4)
        .enumerate()
        .map(|(cell_idx, cell)| {
            (cell[0] == 3)
                .then(|| [cell[1] as usize, cell[2] as usize, cell[3] as usize])
                .ok_or_else(|| {
                    anyhow!(
                        "Expected only triangle cells. Invalid number of vertex indices ({}) of cell {}",
                        cell[0],
                        cell_idx
                    )
                })
        })
        .try_collect_with_capacity(num_cells as usize)
}

/// Tries to convert a vector of consecutive coordinate triplets into a vector of `Vector3`, also converts between floating point types
fn points_from_coords<RealOut: Real, RealIn: Real>(
    coords: &[RealIn],
) -> Result<Vec<Vector3<RealOut>>, anyhow::Error> {
    io_utils::points_from_flat_coords(coords).context("failed to load point coordinates")
}
