//! Exports from groups of participants with a particle type that is not provided by the library

use nalgebra::Vector3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use snapvtk_lib::pipeline::{
    write_ascii_particle_pos, write_particle_vtk, write_selected_particle_vtk, write_surface_vtk,
    write_vertex_ascii_data,
};
use snapvtk_lib::writers::{CloudExportParameters, SurfaceExportParameters, TableExportParameters};
use snapvtk_lib::{
    Aabb3d, Communicator, ExportError, ParticleAccess, ParticleSource, TagSelection, ThreadComm,
    TriMesh3d, TriangleBoundary3d,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A fluid cell of a lattice simulation with density and velocity
#[derive(Clone, Debug)]
struct Cell {
    position: Vector3<f32>,
    id: i64,
    density: f32,
    velocity: Vector3<f32>,
}

impl ParticleAccess<f32> for Cell {
    fn position(&self) -> &Vector3<f32> {
        &self.position
    }

    fn tag(&self) -> i64 {
        self.id
    }

    fn scalar(&self, slot: usize) -> Option<f32> {
        (slot == 0).then_some(self.density)
    }

    fn vector(&self, slot: usize) -> Option<Vector3<f32>> {
        (slot == 0).then_some(self.velocity)
    }
}

/// Slab of a block decomposition along the x axis
struct Slab {
    domain: Aabb3d<f32>,
    cells: Vec<Cell>,
}

impl ParticleSource<f32> for Slab {
    type Particle = Cell;

    fn bounding_box(&self) -> &Aabb3d<f32> {
        &self.domain
    }

    fn local_particles(&self) -> &[Cell] {
        &self.cells
    }
}

const CELLS_PER_SLAB: usize = 4;

fn slab(rank: usize) -> Slab {
    let cells = (0..CELLS_PER_SLAB)
        .map(|i| {
            let id = (rank * CELLS_PER_SLAB + i) as i64;
            Cell {
                position: Vector3::new(id as f32, 0.5, 0.5),
                id,
                density: 1000.0 + id as f32,
                velocity: Vector3::new(0.0, 0.0, -1.0),
            }
        })
        .collect();
    Slab {
        domain: Aabb3d::new(Vector3::zeros(), Vector3::new(16.0, 1.0, 1.0)),
        cells,
    }
}

/// A strip of triangles with one vertex per cell of a group with `size` participants
fn strip(size: usize) -> TriangleBoundary3d<f32> {
    let num_vertices = size * CELLS_PER_SLAB;
    let vertices = (0..num_vertices)
        .map(|i| Vector3::new(i as f32, 0.5, 0.5))
        .collect::<Vec<_>>();
    let triangles = (0..num_vertices - 2).map(|i| [i, i + 1, i + 2]).collect();
    TriangleBoundary3d::new(TriMesh3d::new(vertices, triangles), 0.5, Vector3::zeros()).unwrap()
}

fn run_group<T: Send>(size: usize, f: impl Fn(ThreadComm) -> T + Sync) -> Vec<T> {
    let group = ThreadComm::create_group(size);
    std::thread::scope(|s| {
        let handles = group
            .into_iter()
            .map(|comm| {
                let f = &f;
                s.spawn(move || f(comm))
            })
            .collect::<Vec<_>>();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn data_lines(content: &str, header: &str) -> Vec<String> {
    content
        .lines()
        .skip_while(|l| !l.starts_with(header))
        .skip(1)
        .take_while(|l| !l.is_empty() && !l.starts_with(char::is_alphabetic))
        .map(str::to_string)
        .collect()
}

#[test]
fn test_positions_of_all_participants_in_rank_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("positions.csv");

    let results = run_group(4, |comm| write_ascii_particle_pos(&comm, &slab(comm.rank()), &path));
    assert!(results.iter().all(Result::is_ok));

    let content = fs::read_to_string(&path).unwrap();
    let x = content
        .lines()
        .map(|l| l.split(',').next().unwrap().parse::<f32>().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(x, (0..16).map(|i| i as f32).collect::<Vec<_>>());
}

#[test]
fn test_cloud_with_custom_particles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cloud.vtk");

    let params = CloudExportParameters::new(
        BTreeMap::from([(0, "Density".to_string())]),
        BTreeMap::from([(0, "Velocity".to_string())]),
    );
    let results = run_group(2, |comm| {
        let mut rng = StdRng::seed_from_u64(1);
        write_particle_vtk(&comm, &slab(comm.rank()), &params, &mut rng, &path).unwrap()
    });
    assert_eq!(results, vec![Some(8), None]);

    let content = fs::read_to_string(&path).unwrap();
    let density = content
        .lines()
        .skip_while(|l| *l != "SCALARS Density float")
        .skip(2)
        .collect::<Vec<_>>();
    assert_eq!(density.len(), 8);
    assert_eq!(density[7], " 1.0070000e+03");
}

#[test]
fn test_selected_cloud_only_contains_matching_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("selected.vtk");

    let domain = Aabb3d::new(Vector3::zeros(), Vector3::new(16.0, 1.0, 1.0));
    let even = |tag: i64| tag % 2 == 0;
    let results = run_group(3, |comm| {
        write_selected_particle_vtk(
            &comm,
            &slab(comm.rank()),
            &domain,
            &even,
            &CloudExportParameters::default(),
            &path,
        )
        .unwrap()
    });
    assert_eq!(results, vec![Some(6), None, None]);

    let content = fs::read_to_string(&path).unwrap();
    let tags = content
        .lines()
        .skip_while(|l| *l != "SCALARS Tag float")
        .skip(2)
        .map(|l| l.trim().parse::<f32>().unwrap() as i64)
        .collect::<Vec<_>>();
    assert_eq!(tags, vec![0, 2, 4, 6, 8, 10]);

    let results = run_group(2, |comm| {
        write_selected_particle_vtk(
            &comm,
            &slab(comm.rank()),
            &domain,
            &TagSelection::OneOf(vec![1, 5]),
            &CloudExportParameters::default(),
            &path,
        )
        .unwrap()
    });
    assert_eq!(results, vec![Some(2), None]);
}

#[test]
fn test_surface_and_vertex_table_from_group() {
    let dir = tempfile::tempdir().unwrap();
    let surface_path = dir.path().join("surface.vtk");
    let table_path = dir.path().join("vertices.txt");

    let results = run_group(2, |comm| -> Result<(), ExportError> {
        let mut boundary = strip(comm.size());
        let slab = slab(comm.rank());

        let surface_params = SurfaceExportParameters::new(["Density"], ["Velocity"]);
        write_surface_vtk(&comm, &slab, &mut boundary, &surface_params, &surface_path)?;

        let table_params = TableExportParameters::new(["Density"], []);
        write_vertex_ascii_data(&comm, &slab, &mut boundary, &table_params, false, &table_path)?;

        assert_eq!(boundary.selection_depth(), 0);
        Ok(())
    });
    assert!(results.iter().all(Result::is_ok));

    let surface = fs::read_to_string(&surface_path).unwrap();
    assert!(surface.contains("POINTS 8 float\n"));
    assert!(surface.contains("CELLS 6 24\n"));
    let points = data_lines(&surface, "POINTS");
    assert_eq!(points[3], "1.5 0.25 0.25");

    let table = fs::read_to_string(&table_path).unwrap();
    assert_eq!(table.lines().count(), 8);
    assert_eq!(table.lines().next(), Some("0 0.5 0.5 1000"));
}

#[test]
fn test_failed_export_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vertices.txt");

    // Only the coordinator knows about the mismatch, the other participant is done after the gather
    let results = run_group(2, |comm| {
        let mut boundary = strip(3);
        let params = TableExportParameters::<f32>::new(Vec::<String>::new(), Vec::<String>::new());
        write_vertex_ascii_data(&comm, &slab(comm.rank()), &mut boundary, &params, true, &path)
    });
    assert!(matches!(
        results[0],
        Err(ExportError::VertexCountMismatch {
            num_particles: 8,
            num_vertices: 12
        })
    ));
    assert!(results[1].is_ok());
    assert!(!Path::new(&path).exists());
}
