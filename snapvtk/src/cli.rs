//! The `snapvtk` particle snapshot export CLI.
//!
//! The CLI reads a particle snapshot, distributes it over a group of participants and runs one of
//! the collective exports of the [`snapvtk_lib`] crate on it.

use crate::{export, logging};
use anyhow::Context;
use clap::Parser;
use log::{info, warn};

static HELP_TEMPLATE: &str = "{before-help}{name} (v{version}) - {author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}";

#[derive(Clone, Debug, clap::Parser)]
#[command(
    name = "snapvtk",
    author = "snapvtk developers",
    about = "Export of particle snapshots to legacy VTK and plain text files",
    version,
    propagate_version = true,
    help_template = HELP_TEMPLATE,
)]
pub(crate) struct CommandlineArgs {
    /// Enable quiet mode (no output except for severe panic messages), overrides verbosity level
    #[arg(long, short = 'q', global = true)]
    quiet: bool,
    /// Print more verbose output, use multiple "v"s for even more verbose output (-v, -vv)
    #[arg(short, action = clap::ArgAction::Count, global = true)]
    verbosity: u8,
    /// Subcommands
    #[command(subcommand)]
    pub(crate) subcommand: Subcommand,
}

#[derive(Clone, Debug, clap::Parser)]
pub(crate) enum Subcommand {
    /// Write the particles (or a random sample of them) as VTK point cloud
    #[command(help_template = HELP_TEMPLATE)]
    Cloud(export::CloudSubcommandArgs),
    /// Write the particles attached to the vertices of a boundary mesh as VTK surface mesh
    #[command(help_template = HELP_TEMPLATE)]
    Surface(export::SurfaceSubcommandArgs),
    /// Write the particles attached to the vertices of a boundary mesh as plain text table
    #[command(help_template = HELP_TEMPLATE)]
    Table(export::TableSubcommandArgs),
    /// Write the particle positions as comma separated values
    #[command(help_template = HELP_TEMPLATE)]
    Positions(export::PositionsSubcommandArgs),
}

/// A simple on/off switch for command line arguments.
///
/// For example an argument defined as:
/// ```rust ignore
/// /// Write the mesh with the current vertex positions
/// #[arg(
///     long,
///     default_value = "off",
///     value_name = "off|on",
///     ignore_case = true,
///     require_equals = true
/// )]
/// pub dynamic_mesh: Switch,
/// ```
/// can be used in the CLI as `--dynamic-mesh=on` or `--dynamic-mesh=off`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Switch {
    Off,
    On,
}

impl Switch {
    pub(crate) fn into_bool(self) -> bool {
        match self {
            Switch::Off => false,
            Switch::On => true,
        }
    }
}

/// Runs the snapvtk CLI with the provided command line arguments.
///
/// This function behaves like the binary `snapvtk` command line tool including output to stdout
/// and stderr. It will also exit the process depending on the command line arguments, so it should
/// not be used in typical library contexts.
/// Note that the first argument is always ignored - this is typically the binary name when called using
/// `std::env::args()` from the terminal:
/// ```
/// snapvtk::cli::run_snapvtk(["snapvtk", "--version"]);
/// ```
/// If no placeholder for the binary name is provided it will return an error (and print a help message):
/// ```should_panic
/// snapvtk::cli::run_snapvtk(["--version"]);
/// ```
pub fn run_snapvtk<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    run_snapvtk_impl(args).inspect_err(logging::log_error)
}

fn run_snapvtk_impl<I, T>(args: I) -> Result<(), anyhow::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cmd_args = CommandlineArgs::parse_from(args);

    let verbosity = VerbosityLevel::from(cmd_args.verbosity);
    let is_quiet = cmd_args.quiet;

    logging::initialize_logging(verbosity, is_quiet).context("Failed to initialize logging")?;
    logging::log_program_info();

    let result = run_subcommand(&cmd_args.subcommand);

    info!("Timings:");
    match snapvtk_lib::profiling::write_to_string() {
        Ok(timings) => timings
            .split('\n')
            .filter(|l| !l.is_empty())
            .for_each(|l| info!("{}", l)),
        Err(e) => warn!("Failed to format profiling data: {}", e),
    }

    info!(
        "Finished at {}.",
        chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
    );

    result
}

/// Delegates to the implementation of the given subcommand
pub(crate) fn run_subcommand(subcommand: &Subcommand) -> Result<(), anyhow::Error> {
    match subcommand {
        Subcommand::Cloud(args) => export::cloud_subcommand(args),
        Subcommand::Surface(args) => export::surface_subcommand(args),
        Subcommand::Table(args) => export::table_subcommand(args),
        Subcommand::Positions(args) => export::positions_subcommand(args),
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) enum VerbosityLevel {
    None,
    Verbose,
    VeryVerbose,
    VeryVeryVerbose,
}

impl From<u8> for VerbosityLevel {
    fn from(value: u8) -> Self {
        match value {
            0 => VerbosityLevel::None,
            1 => VerbosityLevel::Verbose,
            2 => VerbosityLevel::VeryVerbose,
            _ => VerbosityLevel::VeryVeryVerbose,
        }
    }
}

impl VerbosityLevel {
    /// Maps this verbosity level to a log filter
    pub fn into_filter(self) -> Option<log::LevelFilter> {
        match self {
            VerbosityLevel::None => None,
            VerbosityLevel::Verbose => Some(log::LevelFilter::Info),
            VerbosityLevel::VeryVerbose => Some(log::LevelFilter::Debug),
            VerbosityLevel::VeryVeryVerbose => Some(log::LevelFilter::Trace),
        }
    }
}

#[cfg(test)]
mod cli_args_tests {
    use super::*;
    use crate::export::SamplingArg;
    use std::path::PathBuf;

    #[test]
    fn verify_main_cli() {
        use clap::CommandFactory;
        CommandlineArgs::command().debug_assert()
    }

    #[test]
    fn verify_subcommand_clis() {
        use clap::CommandFactory;
        export::CloudSubcommandArgs::command().debug_assert();
        export::SurfaceSubcommandArgs::command().debug_assert();
        export::TableSubcommandArgs::command().debug_assert();
        export::PositionsSubcommandArgs::command().debug_assert();
    }

    #[test]
    fn test_help() {
        for subcommand in ["cloud", "surface", "table", "positions"] {
            assert_eq!(
                CommandlineArgs::try_parse_from(["snapvtk", subcommand, "--help"])
                    .expect_err("this command is supposed to fail")
                    .kind(),
                clap::error::ErrorKind::DisplayHelp
            );
        }
    }

    #[test]
    fn test_cloud_cli() {
        let args = CommandlineArgs::try_parse_from([
            "snapvtk",
            "cloud",
            "particles.json",
            "-o",
            "cloud.vtk",
            "--participants=4",
            "--scalar",
            "1=Density",
            "--vector",
            "0=Velocity",
            "--max-count=100",
            "--sampling=without-replacement",
            "--seed=7",
        ])
        .expect("this command is supposed to work");

        if let Subcommand::Cloud(cloud_args) = args.subcommand {
            assert_eq!(cloud_args.input.input_file, PathBuf::from("particles.json"));
            assert_eq!(cloud_args.input.participants, 4);
            assert_eq!(cloud_args.input.double_precision, Switch::Off);
            assert_eq!(cloud_args.scalars, vec![(1, "Density".to_string())]);
            assert_eq!(cloud_args.vectors, vec![(0, "Velocity".to_string())]);
            assert_eq!(cloud_args.max_count, 100);
            assert_eq!(cloud_args.sampling, SamplingArg::WithoutReplacement);
            assert_eq!(cloud_args.seed, Some(7));
        } else {
            panic!("expected cloud subcommand");
        }

        // Invalid attribute mapping
        assert!(
            CommandlineArgs::try_parse_from([
                "snapvtk",
                "cloud",
                "particles.json",
                "-o",
                "cloud.vtk",
                "--scalar",
                "Density",
            ])
            .is_err()
        );

        // Tag list and range are exclusive
        assert_eq!(
            CommandlineArgs::try_parse_from([
                "snapvtk",
                "cloud",
                "particles.json",
                "-o",
                "cloud.vtk",
                "--tags=1,2",
                "--tag-min=0",
            ])
            .expect_err("this command is supposed to fail")
            .kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn test_surface_cli() {
        let args = CommandlineArgs::try_parse_from([
            "snapvtk",
            "surface",
            "particles.json",
            "-o",
            "surface.vtk",
            "--boundary=boundary.json",
            "--scalars=Pressure,Density",
            "--scalar-factors=2.0,1.0",
            "--vectors=Velocity",
            "--dynamic-mesh=on",
            "--region-tag=-1",
            "--double-precision=on",
        ])
        .expect("this command is supposed to work");

        if let Subcommand::Surface(surface_args) = args.subcommand {
            assert_eq!(surface_args.boundary, PathBuf::from("boundary.json"));
            assert_eq!(surface_args.attributes.scalars, vec!["Pressure", "Density"]);
            assert_eq!(surface_args.attributes.scalar_factors, vec![2.0, 1.0]);
            assert_eq!(surface_args.attributes.vectors, vec!["Velocity"]);
            assert!(surface_args.attributes.vector_factors.is_empty());
            assert_eq!(surface_args.dynamic_mesh, Switch::On);
            assert_eq!(surface_args.region_tag, -1);
            assert_eq!(surface_args.input.double_precision, Switch::On);
        } else {
            panic!("expected surface subcommand");
        }

        // Boundary is required
        assert_eq!(
            CommandlineArgs::try_parse_from([
                "snapvtk",
                "surface",
                "particles.json",
                "-o",
                "surface.vtk"
            ])
            .expect_err("this command is supposed to fail")
            .kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }
}
