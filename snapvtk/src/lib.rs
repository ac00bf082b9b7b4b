//! Library target of the `snapvtk` command line tool, see [`cli::run_snapvtk`] for running it
//! programmatically.

pub mod cli;
mod export;
mod io;
mod logging;
