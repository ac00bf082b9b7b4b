//! Convenience functions for importing particle data and boundary meshes from various file formats

pub(crate) mod io_utils;
pub mod json_format;
pub mod vtk_format;
pub mod xyz_format;
