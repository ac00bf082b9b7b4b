//! Triangle boundary meshes with a stack of mesh selections
//!
//! A [`TriangleBoundary3d`] stores four variants of the same surface: open or closed (with lids on
//! the openings of the surface) and static (reference configuration) or dynamic (current vertex
//! positions). Which variant is visible through [`TriangleBoundary3d::mesh`] is controlled by a
//! stack of [`MeshSelection`]s. Writers push a selection with [`TriangleBoundary3d::select`] and
//! the returned [`SelectionGuard`] restores the previous selection when it goes out of scope.

use std::ops::{Deref, DerefMut};

use log::trace;
use nalgebra::Vector3;
use thiserror::Error as ThisError;

use crate::Real;

/// Errors reported when constructing or modifying a boundary
#[derive(Debug, ThisError)]
pub enum BoundaryError {
    /// A triangle refers to a vertex that does not exist
    #[error(
        "triangle {triangle} refers to vertex {vertex} but the mesh only has {num_vertices} vertices"
    )]
    InvalidVertexIndex {
        triangle: usize,
        vertex: usize,
        num_vertices: usize,
    },
    /// The number of triangle region tags differs from the number of triangles
    #[error("mesh has {num_triangles} triangles but {num_tags} triangle tags")]
    TriangleTagCountMismatch { num_triangles: usize, num_tags: usize },
    /// A new set of vertex positions does not match the number of vertices of the mesh
    #[error("expected {expected} vertex positions but got {actual}")]
    VertexCountMismatch { expected: usize, actual: usize },
    /// The boundary geometry parameters are invalid
    #[error("the lattice spacing of a boundary has to be positive and finite")]
    InvalidSpacing,
}

/// A triangle (surface) mesh in 3D where every triangle carries a region tag
#[derive(Clone, Debug, PartialEq)]
pub struct TriMesh3d<R: Real> {
    /// Coordinates of all vertices of the mesh
    pub vertices: Vec<Vector3<R>>,
    /// The triangles of the mesh identified by their vertex indices
    pub triangles: Vec<[usize; 3]>,
    /// Region tag of every triangle
    pub triangle_tags: Vec<i64>,
}

impl<R: Real> TriMesh3d<R> {
    /// Creates a mesh where all triangles carry the region tag `0`
    pub fn new(vertices: Vec<Vector3<R>>, triangles: Vec<[usize; 3]>) -> Self {
        let triangle_tags = vec![0; triangles.len()];
        Self {
            vertices,
            triangles,
            triangle_tags,
        }
    }

    /// Replaces the region tags of the triangles
    pub fn with_triangle_tags(mut self, triangle_tags: Vec<i64>) -> Self {
        self.triangle_tags = triangle_tags;
        self
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Iterator over all triangles with the given region tag, all triangles if the tag is negative
    pub fn triangles_with_tag(&self, region_tag: i64) -> impl Iterator<Item = &[usize; 3]> + '_ {
        self.triangles
            .iter()
            .zip(self.triangle_tags.iter())
            .filter(move |(_, tag)| region_tag < 0 || **tag == region_tag)
            .map(|(tri, _)| tri)
    }

    /// Checks that all triangles refer to existing vertices and that every triangle has a tag
    pub fn validate(&self) -> Result<(), BoundaryError> {
        if self.triangle_tags.len() != self.triangles.len() {
            return Err(BoundaryError::TriangleTagCountMismatch {
                num_triangles: self.triangles.len(),
                num_tags: self.triangle_tags.len(),
            });
        }

        let num_vertices = self.vertices.len();
        for (triangle, tri) in self.triangles.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&v| v >= num_vertices) {
                return Err(BoundaryError::InvalidVertexIndex {
                    triangle,
                    vertex,
                    num_vertices,
                });
            }
        }

        Ok(())
    }
}

/// Whether the openings of the surface are closed with lids
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MeshTopology {
    #[default]
    Open,
    Closed,
}

/// Whether the reference configuration or the current vertex positions are used
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MeshMotion {
    #[default]
    Static,
    Dynamic,
}

/// Determines which variant of a boundary mesh is currently visible
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshSelection {
    pub topology: MeshTopology,
    pub motion: MeshMotion,
}

impl MeshSelection {
    pub fn new(topology: MeshTopology, motion: MeshMotion) -> Self {
        Self { topology, motion }
    }

    /// Selection of the open mesh, with current vertex positions if `dynamic` is set
    pub fn open(dynamic: bool) -> Self {
        let motion = if dynamic {
            MeshMotion::Dynamic
        } else {
            MeshMotion::Static
        };
        Self::new(MeshTopology::Open, motion)
    }

    fn variant_index(&self) -> usize {
        let topology = match self.topology {
            MeshTopology::Open => 0,
            MeshTopology::Closed => 1,
        };
        let motion = match self.motion {
            MeshMotion::Static => 0,
            MeshMotion::Dynamic => 2,
        };
        topology + motion
    }
}

/// A triangulated boundary surface embedded in the lattice of a simulation
///
/// Vertex coordinates are stored in lattice units. The mapping to physical coordinates is given by
/// the lattice spacing [`dx`](Self::dx) and the [`physical_location`](Self::physical_location) of
/// the lattice origin.
#[derive(Clone, Debug)]
pub struct TriangleBoundary3d<R: Real> {
    /// Mesh variants: open static, closed static, open dynamic, closed dynamic
    meshes: [TriMesh3d<R>; 4],
    dx: R,
    physical_location: Vector3<R>,
    /// Stack of selections, the first entry is the base selection and is never removed
    selections: Vec<MeshSelection>,
}

impl<R: Real> TriangleBoundary3d<R> {
    /// Creates a boundary from an open surface mesh
    ///
    /// All variants initially share the geometry of the given mesh. The base selection is the open,
    /// static mesh.
    pub fn new(
        mesh: TriMesh3d<R>,
        dx: R,
        physical_location: Vector3<R>,
    ) -> Result<Self, BoundaryError> {
        mesh.validate()?;
        if !(dx > R::zero() && dx.is_finite()) {
            return Err(BoundaryError::InvalidSpacing);
        }

        Ok(Self {
            meshes: [mesh.clone(), mesh.clone(), mesh.clone(), mesh],
            dx,
            physical_location,
            selections: vec![MeshSelection::default()],
        })
    }

    /// Replaces both closed variants of the boundary by the given mesh
    pub fn with_closed_mesh(mut self, closed: TriMesh3d<R>) -> Result<Self, BoundaryError> {
        closed.validate()?;
        self.meshes[MeshSelection::new(MeshTopology::Closed, MeshMotion::Dynamic).variant_index()] =
            closed.clone();
        self.meshes[MeshSelection::new(MeshTopology::Closed, MeshMotion::Static).variant_index()] =
            closed;
        Ok(self)
    }

    /// Replaces the base selection that is active when no other selection was pushed
    pub fn with_base_selection(mut self, base: MeshSelection) -> Self {
        self.selections[0] = base;
        self
    }

    /// Updates the current vertex positions of the dynamic variant with the given topology
    pub fn set_dynamic_vertices(
        &mut self,
        topology: MeshTopology,
        vertices: Vec<Vector3<R>>,
    ) -> Result<(), BoundaryError> {
        let mesh = &mut self.meshes[MeshSelection::new(topology, MeshMotion::Dynamic).variant_index()];
        if mesh.vertices.len() != vertices.len() {
            return Err(BoundaryError::VertexCountMismatch {
                expected: mesh.vertices.len(),
                actual: vertices.len(),
            });
        }
        mesh.vertices = vertices;
        Ok(())
    }

    /// Lattice spacing, i.e. the size of a lattice cell in physical units
    pub fn dx(&self) -> R {
        self.dx
    }

    /// Physical coordinates of the lattice origin
    pub fn physical_location(&self) -> &Vector3<R> {
        &self.physical_location
    }

    /// Converts a position in lattice units into physical coordinates
    pub fn to_physical(&self, position: &Vector3<R>) -> Vector3<R> {
        position * self.dx + self.physical_location
    }

    /// The mesh variant visible under the current selection
    pub fn mesh(&self) -> &TriMesh3d<R> {
        &self.meshes[self.current_selection().variant_index()]
    }

    /// The selection on top of the selection stack
    pub fn current_selection(&self) -> MeshSelection {
        // The base selection is never popped
        self.selections.last().copied().unwrap_or_default()
    }

    /// Number of selections pushed on top of the base selection
    pub fn selection_depth(&self) -> usize {
        self.selections.len() - 1
    }

    /// Makes the given selection current, has to be balanced by a call to [`pop_select`](Self::pop_select)
    pub fn push_select(&mut self, selection: MeshSelection) {
        trace!("Push boundary selection {:?}", selection);
        self.selections.push(selection);
    }

    /// Restores the selection that was current before the last [`push_select`](Self::push_select)
    ///
    /// Returns the removed selection or `None` if only the base selection is left.
    pub fn pop_select(&mut self) -> Option<MeshSelection> {
        if self.selections.len() > 1 {
            let selection = self.selections.pop();
            trace!("Pop boundary selection {:?}", selection);
            selection
        } else {
            None
        }
    }

    /// Pushes a selection that is popped again when the returned guard is dropped
    pub fn select(&mut self, selection: MeshSelection) -> SelectionGuard<'_, R> {
        self.push_select(selection);
        SelectionGuard { boundary: self }
    }
}

/// Scope guard of a pushed [`MeshSelection`], restores the previous selection on drop
///
/// The guard dereferences to the boundary so that it can be used in place of the boundary while
/// the selection is active.
pub struct SelectionGuard<'a, R: Real> {
    boundary: &'a mut TriangleBoundary3d<R>,
}

impl<R: Real> Deref for SelectionGuard<'_, R> {
    type Target = TriangleBoundary3d<R>;

    fn deref(&self) -> &Self::Target {
        self.boundary
    }
}

impl<R: Real> DerefMut for SelectionGuard<'_, R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.boundary
    }
}

impl<R: Real> Drop for SelectionGuard<'_, R> {
    fn drop(&mut self) {
        self.boundary.pop_select();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> TriMesh3d<f64> {
        TriMesh3d::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 1.0, 0.0),
                Vector3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .with_triangle_tags(vec![0, 1])
    }

    fn lifted(mesh: &TriMesh3d<f64>) -> Vec<Vector3<f64>> {
        mesh.vertices
            .iter()
            .map(|v| v + Vector3::new(0.0, 0.0, 1.0))
            .collect()
    }

    #[test]
    fn test_mesh_validation() {
        assert!(square().validate().is_ok());

        let mut broken = square();
        broken.triangles.push([0, 1, 4]);
        assert!(matches!(
            broken.validate(),
            Err(BoundaryError::TriangleTagCountMismatch { .. })
        ));
        broken.triangle_tags.push(0);
        assert!(matches!(
            broken.validate(),
            Err(BoundaryError::InvalidVertexIndex {
                triangle: 2,
                vertex: 4,
                num_vertices: 4
            })
        ));

        assert!(matches!(
            TriangleBoundary3d::new(square(), 0.0, Vector3::zeros()),
            Err(BoundaryError::InvalidSpacing)
        ));
    }

    #[test]
    fn test_triangles_with_tag() {
        let mesh = square();
        assert_eq!(mesh.triangles_with_tag(0).count(), 1);
        assert_eq!(mesh.triangles_with_tag(1).collect::<Vec<_>>(), vec![&[0, 2, 3]]);
        assert_eq!(mesh.triangles_with_tag(-1).count(), 2);
        assert_eq!(mesh.triangles_with_tag(5).count(), 0);
    }

    #[test]
    fn test_selection_stack() {
        let mesh = square();
        let moved = lifted(&mesh);
        let mut boundary = TriangleBoundary3d::new(mesh.clone(), 0.5, Vector3::zeros()).unwrap();
        boundary
            .set_dynamic_vertices(MeshTopology::Open, moved.clone())
            .unwrap();

        assert_eq!(boundary.current_selection(), MeshSelection::open(false));
        assert_eq!(boundary.mesh().vertices, mesh.vertices);

        boundary.push_select(MeshSelection::open(true));
        assert_eq!(boundary.mesh().vertices, moved);
        assert_eq!(boundary.selection_depth(), 1);
        assert_eq!(boundary.pop_select(), Some(MeshSelection::open(true)));

        // The base selection stays in place
        assert_eq!(boundary.pop_select(), None);
        assert_eq!(boundary.selection_depth(), 0);
        assert_eq!(boundary.mesh().vertices, mesh.vertices);
    }

    #[test]
    fn test_selection_guard_restores_selection() {
        let mesh = square();
        let moved = lifted(&mesh);
        let mut boundary = TriangleBoundary3d::new(mesh.clone(), 1.0, Vector3::zeros())
            .unwrap()
            .with_base_selection(MeshSelection::open(true));
        boundary
            .set_dynamic_vertices(MeshTopology::Open, moved.clone())
            .unwrap();

        {
            let guard = boundary.select(MeshSelection::open(false));
            assert_eq!(guard.mesh().vertices, mesh.vertices);
            assert_eq!(guard.selection_depth(), 1);
        }
        assert_eq!(boundary.selection_depth(), 0);
        assert_eq!(boundary.mesh().vertices, moved);

        let result: Result<(), ()> = (|| {
            let _guard = boundary.select(MeshSelection::open(false));
            Err(())
        })();
        assert!(result.is_err());
        assert_eq!(boundary.current_selection(), MeshSelection::open(true));
    }

    #[test]
    fn test_closed_mesh_variant() {
        let open = square();
        let mut closed = square();
        closed.vertices.push(Vector3::new(0.5, 0.5, -1.0));
        closed.triangles.push([0, 1, 4]);
        closed.triangle_tags.push(2);

        let mut boundary = TriangleBoundary3d::new(open, 2.0, Vector3::new(1.0, 0.0, 0.0))
            .unwrap()
            .with_closed_mesh(closed)
            .unwrap();

        let guard = boundary.select(MeshSelection::new(MeshTopology::Closed, MeshMotion::Static));
        assert_eq!(guard.mesh().num_vertices(), 5);
        assert_eq!(guard.mesh().num_triangles(), 3);
        drop(guard);
        assert_eq!(boundary.mesh().num_vertices(), 4);

        assert!(matches!(
            boundary.set_dynamic_vertices(MeshTopology::Closed, vec![Vector3::zeros(); 4]),
            Err(BoundaryError::VertexCountMismatch {
                expected: 5,
                actual: 4
            })
        ));
        assert_eq!(
            boundary.to_physical(&Vector3::new(1.0, 1.0, 1.0)),
            Vector3::new(3.0, 2.0, 2.0)
        );
    }
}
