//! Number formatting and file handling shared by the writers

use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use crate::{ExportError, Real};

/// Capacity of the buffered writers used for all output files
const WRITER_CAPACITY: usize = 100_000;

/// Name of the VTK data type matching the precision of `R`
pub fn vtk_real_type<R: Real>() -> &'static str {
    if R::is_double_precision() {
        "double"
    } else {
        "float"
    }
}

/// Formats a single precision value like the C format specifier `% .7e`
///
/// Non-negative values are prefixed by a space, the mantissa has seven decimal places and the
/// exponent is signed with at least two digits, e.g. ` 1.0000000e+00` or `-2.5000000e-03`.
#[derive(Copy, Clone, Debug)]
pub struct SciNotation(pub f32);

impl fmt::Display for SciNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            return f.write_str(" nan");
        }
        if value.is_infinite() {
            return f.write_str(if value > 0.0 { " inf" } else { "-inf" });
        }

        let formatted = format!("{:.7e}", value);
        let (mantissa, exponent) = formatted
            .split_once('e')
            .unwrap_or((formatted.as_str(), "0"));
        let exponent: i32 = exponent.parse().unwrap_or(0);

        let sign = if mantissa.starts_with('-') { "" } else { " " };
        let exponent_sign = if exponent < 0 { '-' } else { '+' };
        write!(
            f,
            "{}{}e{}{:02}",
            sign,
            mantissa,
            exponent_sign,
            exponent.unsigned_abs()
        )
    }
}

/// Creates (or truncates) the output file at the given path and wraps it in a buffered writer
///
/// Missing parent directories are created.
pub fn create_output_file(path: &Path) -> Result<BufWriter<File>, ExportError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(ExportError::io(dir))?;
    }

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(ExportError::io(path))?;
    Ok(BufWriter::with_capacity(WRITER_CAPACITY, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sci(value: f32) -> String {
        SciNotation(value).to_string()
    }

    #[test]
    fn test_sci_notation() {
        assert_eq!(sci(1.0), " 1.0000000e+00");
        assert_eq!(sci(0.0), " 0.0000000e+00");
        assert_eq!(sci(-0.25), "-2.5000000e-01");
        assert_eq!(sci(123456.0), " 1.2345600e+05");
        assert_eq!(sci(2.0f32.powi(-40)), " 9.0949470e-13");
        assert_eq!(sci(-1536.0), "-1.5360000e+03");
        assert_eq!(sci(f32::NAN), " nan");
        assert_eq!(sci(f32::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_vtk_real_type() {
        assert_eq!(vtk_real_type::<f32>(), "float");
        assert_eq!(vtk_real_type::<f64>(), "double");
    }

    #[test]
    fn test_create_output_file_creates_directories() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");
        {
            let mut writer = create_output_file(&path).unwrap();
            writeln!(writer, "first").unwrap();
        }
        {
            let mut writer = create_output_file(&path).unwrap();
            writeln!(writer, "second").unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "second\n");
    }
}
