//! Plain text exports of particle data

use std::io::{self, Write};
use std::path::Path;

use log::info;
use nalgebra::Vector3;

use super::format::create_output_file;
use super::{check_factor_count, scaled_scalar, scaled_vector};
use crate::{AttributeKind, ExportError, ParticleAccess, Real, profile};

/// Parameters of a plain text table export
#[derive(Clone, Debug, Default)]
pub struct TableExportParameters<R: Real> {
    /// Names of the scalar columns, the `i`-th name refers to scalar slot `i`
    pub scalar_names: Vec<String>,
    /// Names of the vector columns, the `i`-th name refers to vector slot `i`
    pub vector_names: Vec<String>,
    /// Scale factors of the scalar attributes, either empty or one per scalar name
    pub scalar_factors: Vec<R>,
    /// Scale factors of the vector attributes, either empty or one per vector name
    pub vector_factors: Vec<R>,
    /// Whether to write a header line with the column names
    pub print_header: bool,
}

impl<R: Real> TableExportParameters<R> {
    pub fn new<S: Into<String>>(
        scalar_names: impl IntoIterator<Item = S>,
        vector_names: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            scalar_names: scalar_names.into_iter().map(Into::into).collect(),
            vector_names: vector_names.into_iter().map(Into::into).collect(),
            scalar_factors: Vec::new(),
            vector_factors: Vec::new(),
            print_header: false,
        }
    }

    pub fn with_factors(mut self, scalar_factors: Vec<R>, vector_factors: Vec<R>) -> Self {
        self.scalar_factors = scalar_factors;
        self.vector_factors = vector_factors;
        self
    }

    pub fn with_header(mut self, print_header: bool) -> Self {
        self.print_header = print_header;
        self
    }

    /// Checks that the factor lists are either empty or match the lengths of the name lists
    pub fn validate(&self) -> Result<(), ExportError> {
        check_factor_count(AttributeKind::Scalar, &self.scalar_names, &self.scalar_factors)?;
        check_factor_count(AttributeKind::Vector, &self.vector_names, &self.vector_factors)?;
        Ok(())
    }

    fn header(&self) -> String {
        let mut columns = vec!["Pos[0]".to_string(), "Pos[1]".to_string(), "Pos[2]".to_string()];
        columns.extend(self.scalar_names.iter().cloned());
        for name in &self.vector_names {
            columns.extend((0..3).map(|i| format!("{}[{}]", name, i)));
        }
        columns.join(" ")
    }
}

/// One row of the table: position, scaled scalars and scaled vectors of a particle
struct Row<R: Real> {
    position: Vector3<R>,
    scalars: Vec<R>,
    vectors: Vec<Vector3<R>>,
}

/// Writes one line per particle with its position followed by the requested scalar and vector attributes
///
/// Positions are written as stored in the particles. Attribute values are multiplied by their
/// factor if factors are given. All columns are separated by a single space. Invalid factor lists
/// and missing attributes are reported before the output file is created.
pub fn write_ascii_table<R: Real, P: ParticleAccess<R>, Pth: AsRef<Path>>(
    particles: &[P],
    params: &TableExportParameters<R>,
    path: Pth,
) -> Result<(), ExportError> {
    profile!("write_ascii_table");
    let path = path.as_ref();

    params.validate()?;
    let rows = particles
        .iter()
        .map(|particle| -> Result<Row<R>, ExportError> {
            let scalars = (0..params.scalar_names.len())
                .map(|slot| scaled_scalar(particle, slot, &params.scalar_factors))
                .collect::<Result<Vec<_>, _>>()?;
            let vectors = (0..params.vector_names.len())
                .map(|slot| scaled_vector(particle, slot, &params.vector_factors))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Row {
                position: *particle.position(),
                scalars,
                vectors,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut writer = create_output_file(path)?;
    write_rows(&mut writer, &rows, params)
        .and_then(|_| writer.flush())
        .map_err(ExportError::io(path))?;

    info!(
        "Wrote table of {} particles to \"{}\".",
        rows.len(),
        path.display()
    );
    Ok(())
}

fn write_rows<W: Write, R: Real>(
    writer: &mut W,
    rows: &[Row<R>],
    params: &TableExportParameters<R>,
) -> io::Result<()> {
    if params.print_header {
        writeln!(writer, "{}", params.header())?;
    }

    for row in rows {
        let p = &row.position;
        write!(writer, "{} {} {}", p.x, p.y, p.z)?;
        for s in &row.scalars {
            write!(writer, " {}", s)?;
        }
        for v in &row.vectors {
            write!(writer, " {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Writes the positions of the particles as comma separated `x,y,z` lines
pub fn write_ascii_positions<R: Real, P: ParticleAccess<R>, Pth: AsRef<Path>>(
    particles: &[P],
    path: Pth,
) -> Result<(), ExportError> {
    profile!("write_ascii_positions");
    let path = path.as_ref();

    let mut writer = create_output_file(path)?;
    particles
        .iter()
        .try_for_each(|particle| {
            let p = particle.position();
            writeln!(writer, "{},{},{}", p.x, p.y, p.z)
        })
        .and_then(|_| writer.flush())
        .map_err(ExportError::io(path))?;

    info!(
        "Wrote positions of {} particles to \"{}\".",
        particles.len(),
        path.display()
    );
    Ok(())
}
