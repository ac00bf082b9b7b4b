//! Helper functions for the JSON snapshot and boundary file formats

use crate::boundary::{MeshTopology, TriMesh3d, TriangleBoundary3d};
use crate::io::io_utils::IteratorExt;
use crate::particles::Particle;
use crate::{Real, RealConvert};
use anyhow::{Context, anyhow};
use nalgebra::Vector3;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// A particle as stored in a JSON snapshot file
#[derive(Clone, Debug, Deserialize)]
struct JsonParticle {
    position: [f64; 3],
    /// Defaults to the index of the particle in the file
    #[serde(default)]
    tag: Option<i64>,
    #[serde(default)]
    scalars: Vec<f64>,
    #[serde(default)]
    vectors: Vec<[f64; 3]>,
}

/// Contents of a JSON snapshot file, either bare positions or particles with attributes
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum JsonSnapshot {
    Positions(Vec<[f64; 3]>),
    Particles(Vec<JsonParticle>),
}

#[derive(Clone, Debug, Deserialize)]
struct JsonMesh {
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
    /// Region tag of every triangle, all triangles have tag `0` if omitted
    #[serde(default)]
    triangle_tags: Option<Vec<i64>>,
}

/// Contents of a JSON boundary file
#[derive(Clone, Debug, Deserialize)]
struct JsonBoundary {
    #[serde(flatten)]
    mesh: JsonMesh,
    #[serde(default = "default_dx")]
    dx: f64,
    #[serde(default)]
    physical_location: [f64; 3],
    /// Mesh with lids on the openings of the surface
    #[serde(default)]
    closed: Option<JsonMesh>,
    /// Current vertex positions of the open mesh
    #[serde(default)]
    dynamic_vertices: Option<Vec<[f64; 3]>>,
}

fn default_dx() -> f64 {
    1.0
}

fn convert_vector<R: Real>(v: &[f64; 3]) -> Result<Vector3<R>, anyhow::Error> {
    Vector3::new(v[0], v[1], v[2]).try_convert().ok_or_else(|| {
        anyhow!(
            "Failed to convert coordinate {:?} from input to output float type, value out of range?",
            v
        )
    })
}

fn convert_vectors<R: Real>(values: &[[f64; 3]]) -> Result<Vec<Vector3<R>>, anyhow::Error> {
    values
        .iter()
        .map(convert_vector)
        .try_collect_with_capacity(values.len())
}

fn convert_scalar<R: Real>(value: f64) -> Result<R, anyhow::Error> {
    value
        .try_convert()
        .ok_or_else(|| anyhow!("Failed to convert scalar {} to output float type", value))
}

impl JsonMesh {
    fn into_mesh<R: Real>(self) -> Result<TriMesh3d<R>, anyhow::Error> {
        let mut mesh = TriMesh3d::new(convert_vectors(&self.vertices)?, self.triangles);
        if let Some(tags) = self.triangle_tags {
            mesh = mesh.with_triangle_tags(tags);
        }
        Ok(mesh)
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path, expected: &str) -> Result<T, anyhow::Error> {
    let file = File::open(path).context("Cannot open file for JSON parsing")?;
    let reader = BufReader::new(file);

    let json: serde_json::Value = serde_json::from_reader(reader)
        .context("Reading of file to JSON structure failed. Not a valid JSON file.")?;
    serde_json::from_value::<T>(json).with_context(|| {
        format!(
            "Parsing of JSON structure failed. Expected JSON file containing {}.",
            expected
        )
    })
}

/// Convenience function for loading particles from a JSON snapshot file
///
/// The file contains either an array of particle positions or an array of particle objects with
/// optional tag and attributes. For example:
/// ```json
/// [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]
/// ```
/// or
/// ```json
/// [{"position": [1.0, 2.0, 3.0], "tag": 7, "scalars": [0.5], "vectors": [[0.0, 1.0, 0.0]]}]
/// ```
/// Particles without explicit tag are tagged with their index in the file.
pub fn particles_from_json<R: Real, P: AsRef<Path>>(
    json_file: P,
) -> Result<Vec<Particle<R>>, anyhow::Error> {
    let snapshot: JsonSnapshot = read_json(
        json_file.as_ref(),
        "particle positions like '[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]' or particle objects with a 'position' field",
    )?;

    match snapshot {
        JsonSnapshot::Positions(positions) => Ok(convert_vectors(&positions)?
            .into_iter()
            .enumerate()
            .map(|(i, position)| Particle::new(position, i as i64))
            .collect()),
        JsonSnapshot::Particles(particles) => {
            let len = particles.len();
            particles
                .into_iter()
                .enumerate()
                .map(|(i, p)| -> Result<Particle<R>, anyhow::Error> {
                    let scalars = p
                        .scalars
                        .iter()
                        .map(|&s| convert_scalar(s))
                        .try_collect_with_capacity(p.scalars.len())?;
                    Ok(
                        Particle::new(convert_vector(&p.position)?, p.tag.unwrap_or(i as i64))
                            .with_scalars(scalars)
                            .with_vectors(convert_vectors(&p.vectors)?),
                    )
                })
                .try_collect_with_capacity(len)
        }
    }
}

/// Convenience function for loading a triangle boundary from a JSON file
///
/// Example of a boundary with two triangles, the lattice spacing `dx` defaults to `1.0` and the
/// `physical_location` of the lattice origin to zero:
/// ```json
/// {
///   "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
///   "triangles": [[0, 1, 2], [0, 2, 3]],
///   "triangle_tags": [0, 1],
///   "dx": 0.01,
///   "physical_location": [0.0, 0.0, 0.0]
/// }
/// ```
/// Optional fields are `closed` (a mesh object with `vertices`, `triangles` and `triangle_tags`)
/// and `dynamic_vertices` (the current vertex positions of the open mesh).
pub fn boundary_from_json<R: Real, P: AsRef<Path>>(
    json_file: P,
) -> Result<TriangleBoundary3d<R>, anyhow::Error> {
    let json: JsonBoundary = read_json(
        json_file.as_ref(),
        "a boundary object with 'vertices' and 'triangles' fields",
    )?;

    let mut boundary = TriangleBoundary3d::new(
        json.mesh.into_mesh()?,
        convert_scalar(json.dx)?,
        convert_vector(&json.physical_location)?,
    )?;
    if let Some(closed) = json.closed {
        boundary = boundary.with_closed_mesh(closed.into_mesh()?)?;
    }
    if let Some(dynamic_vertices) = json.dynamic_vertices {
        boundary.set_dynamic_vertices(MeshTopology::Open, convert_vectors(&dynamic_vertices)?)?;
    }

    Ok(boundary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::MeshSelection;
    use std::fs;

    #[test]
    fn test_particles_from_json_positions() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("positions.json");
        fs::write(&path, "[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]")?;

        let particles = particles_from_json::<f32, _>(&path)?;
        assert_eq!(particles.len(), 2);
        assert_eq!(particles[1].position, Vector3::new(4.0, 5.0, 6.0));
        assert_eq!(particles[1].tag, 1);
        Ok(())
    }

    #[test]
    fn test_particles_from_json_objects() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("particles.json");
        fs::write(
            &path,
            r#"[
                {"position": [1.0, 2.0, 3.0], "tag": 7, "scalars": [0.5], "vectors": [[0.0, 1.0, 0.0]]},
                {"position": [0.0, 0.0, 0.0]}
            ]"#,
        )?;

        let particles = particles_from_json::<f64, _>(&path)?;
        assert_eq!(particles[0].tag, 7);
        assert_eq!(particles[0].scalars, vec![0.5]);
        assert_eq!(particles[0].vectors, vec![Vector3::new(0.0, 1.0, 0.0)]);
        assert_eq!(particles[1].tag, 1);
        assert!(particles[1].scalars.is_empty());
        Ok(())
    }

    #[test]
    fn test_particles_from_invalid_json() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("invalid.json");
        fs::write(&path, r#"{"position": 1}"#)?;
        assert!(particles_from_json::<f64, _>(&path).is_err());
        Ok(())
    }

    #[test]
    fn test_boundary_from_json() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("boundary.json");
        fs::write(
            &path,
            r#"{
                "vertices": [[0, 0, 0], [1, 0, 0], [1, 1, 0], [0, 1, 0]],
                "triangles": [[0, 1, 2], [0, 2, 3]],
                "triangle_tags": [0, 1],
                "dx": 0.5,
                "physical_location": [1.0, 0.0, 0.0],
                "dynamic_vertices": [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]]
            }"#,
        )?;

        let mut boundary = boundary_from_json::<f64, _>(&path)?;
        assert_eq!(boundary.dx(), 0.5);
        assert_eq!(boundary.mesh().triangle_tags, vec![0, 1]);
        assert_eq!(boundary.mesh().vertices[2], Vector3::new(1.0, 1.0, 0.0));

        let dynamic = boundary.select(MeshSelection::open(true));
        assert_eq!(dynamic.mesh().vertices[2], Vector3::new(1.0, 1.0, 1.0));
        Ok(())
    }

    #[test]
    fn test_boundary_from_json_with_invalid_triangle() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("boundary.json");
        fs::write(&path, r#"{"vertices": [[0, 0, 0]], "triangles": [[0, 1, 2]]}"#)?;
        assert!(boundary_from_json::<f64, _>(&path).is_err());
        Ok(())
    }
}
