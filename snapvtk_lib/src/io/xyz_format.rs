//! Helper functions for the binary `.xyz` float coordinate format

use crate::{Real, RealConvert};
use anyhow::{Context, anyhow};
use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Reads particle positions stored as consecutive native endian `f32` triplets
///
/// A trailing incomplete triplet at the end of the file is ignored.
pub fn particles_from_xyz<R: Real, P: AsRef<Path>>(
    xyz_file: P,
) -> Result<Vec<Vector3<R>>, anyhow::Error> {
    let file = File::open(xyz_file).context("Unable to open XYZ file for reading")?;
    let mut reader = BufReader::new(file);

    let mut buffer = [0u8; 3 * 4];
    let mut particles = Vec::new();

    loop {
        match reader.read_exact(&mut buffer) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Failed to read from XYZ file"),
        }

        let mut coords = buffer
            .chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
        let position = Vector3::from_iterator(&mut coords);
        let converted = position.try_convert().ok_or_else(|| {
            anyhow!(
                "Failed to convert particle {} at {:?} to output float type",
                particles.len(),
                position
            )
        })?;
        particles.push(converted);
    }

    Ok(particles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_particles_from_xyz() -> Result<(), anyhow::Error> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("particles.xyz");

        let mut bytes = [1.0f32, 2.0, 3.0, -4.0, 0.5, 6.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect::<Vec<_>>();
        // Incomplete trailing triplet
        bytes.extend(7.0f32.to_ne_bytes());
        fs::write(&path, bytes)?;

        let particles = particles_from_xyz::<f64, _>(&path)?;
        assert_eq!(
            particles,
            vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(-4.0, 0.5, 6.0)]
        );
        Ok(())
    }
}
