//! Export of particles as legacy VTK point cloud

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use log::info;
use nalgebra::Vector3;
use rand::Rng;

use super::format::{SciNotation, create_output_file};
use crate::sampling::{SamplingStrategy, sample};
use crate::{AttributeKind, ExportError, ParticleAccess, Real, profile};

/// Parameters of a point cloud export
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudExportParameters {
    /// Scalar attributes to write, by slot
    pub scalars: BTreeMap<usize, String>,
    /// Vector attributes to write, by slot
    pub vectors: BTreeMap<usize, String>,
    /// Maximum number of particles to write, zero writes all particles
    pub max_count: usize,
    /// How the written particles are sampled if there are more than `max_count`
    pub sampling: SamplingStrategy,
}

/// Writes vector slot `0` as `Velocity`, no scalars and all particles
impl Default for CloudExportParameters {
    fn default() -> Self {
        Self {
            scalars: BTreeMap::new(),
            vectors: BTreeMap::from([(0, "Velocity".to_string())]),
            max_count: 0,
            sampling: SamplingStrategy::default(),
        }
    }
}

impl CloudExportParameters {
    /// Parameters writing the given attributes of all particles
    pub fn new(scalars: BTreeMap<usize, String>, vectors: BTreeMap<usize, String>) -> Self {
        Self {
            scalars,
            vectors,
            ..Default::default()
        }
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = max_count;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingStrategy) -> Self {
        self.sampling = sampling;
        self
    }
}

/// Writes the particles as legacy VTK unstructured grid without cells and returns the number of written particles
///
/// If `max_count` of the parameters is non-zero and smaller than the number of particles, a random
/// sample of `max_count` particles drawn from `rng` is written instead of all particles. Every
/// particle is written with its position, the requested vector attributes (ascending slot), its tag
/// and the requested scalar attributes (ascending slot). All values are written in single
/// precision. Missing attributes are reported before the output file is created.
pub fn write_particle_cloud_vtk<R, P, G, Pth>(
    particles: &[P],
    params: &CloudExportParameters,
    rng: &mut G,
    path: Pth,
) -> Result<usize, ExportError>
where
    R: Real,
    P: ParticleAccess<R>,
    G: Rng + ?Sized,
    Pth: AsRef<Path>,
{
    profile!("write_particle_cloud_vtk");

    let selected = sample(
        &particles.iter().collect::<Vec<_>>(),
        params.max_count,
        params.sampling,
        rng,
    );
    write_particle_cloud::<R, _>(&selected, params, path.as_ref())?;
    Ok(selected.len())
}

/// Writes all given particles without sampling
pub(crate) fn write_particle_cloud<R: Real, P: ParticleAccess<R>>(
    particles: &[P],
    params: &CloudExportParameters,
    path: &Path,
) -> Result<(), ExportError> {
    check_attributes(particles, params)?;

    let mut writer = create_output_file(path)?;
    write_cloud_data(&mut writer, particles, params)
        .and_then(|_| writer.flush())
        .map_err(ExportError::io(path))?;

    info!(
        "Wrote {} particles to \"{}\".",
        particles.len(),
        path.display()
    );
    Ok(())
}

fn check_attributes<R: Real, P: ParticleAccess<R>>(
    particles: &[P],
    params: &CloudExportParameters,
) -> Result<(), ExportError> {
    for particle in particles {
        if let Some(&slot) = params
            .vectors
            .keys()
            .find(|&&slot| particle.vector(slot).is_none())
        {
            return Err(ExportError::MissingAttribute {
                kind: AttributeKind::Vector,
                slot,
                tag: particle.tag(),
            });
        }
        if let Some(&slot) = params
            .scalars
            .keys()
            .find(|&&slot| particle.scalar(slot).is_none())
        {
            return Err(ExportError::MissingAttribute {
                kind: AttributeKind::Scalar,
                slot,
                tag: particle.tag(),
            });
        }
    }
    Ok(())
}

fn write_cloud_data<W: Write, R: Real, P: ParticleAccess<R>>(
    writer: &mut W,
    particles: &[P],
    params: &CloudExportParameters,
) -> io::Result<()> {
    let write_vector = |writer: &mut W, v: Vector3<R>| {
        writeln!(
            writer,
            "{} {} {}",
            SciNotation(v.x.to_f32_lossy()),
            SciNotation(v.y.to_f32_lossy()),
            SciNotation(v.z.to_f32_lossy())
        )
    };

    writeln!(writer, "# vtk DataFile Version 3.0")?;
    writeln!(writer, "Particle file exported by snapvtk")?;
    writeln!(writer, "ASCII")?;
    writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;

    writeln!(writer, "POINTS {:>12} float", particles.len())?;
    for particle in particles {
        write_vector(writer, *particle.position())?;
    }

    writeln!(writer, "POINT_DATA {:>12}", particles.len())?;
    for (&slot, name) in &params.vectors {
        writeln!(writer, "VECTORS {} float", name)?;
        for particle in particles {
            write_vector(writer, particle.vector(slot).unwrap_or_else(Vector3::zeros))?;
        }
    }

    writeln!(writer, "SCALARS Tag float")?;
    writeln!(writer, "LOOKUP_TABLE default")?;
    for particle in particles {
        writeln!(writer, "{}", SciNotation(particle.tag() as f32))?;
    }

    for (&slot, name) in &params.scalars {
        writeln!(writer, "SCALARS {} float", name)?;
        writeln!(writer, "LOOKUP_TABLE default")?;
        for particle in particles {
            let value = particle.scalar(slot).unwrap_or_default();
            writeln!(writer, "{}", SciNotation(value.to_f32_lossy()))?;
        }
    }

    Ok(())
}
