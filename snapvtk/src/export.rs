//! Implementation of the export subcommands of the snapvtk CLI.
//!
//! All subcommands read the particle snapshot, split it into one partition per participant and run
//! the collective export of the library on a group of participants with one thread each. This
//! mimics the export from a simulation that is distributed over several processes.

use crate::cli::Switch;
use crate::io;
use anyhow::{Context, anyhow};
use clap::value_parser;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use snapvtk_lib::nalgebra::Vector3;
use snapvtk_lib::pipeline::{
    write_ascii_particle_pos, write_particle_vtk, write_selected_particle_vtk, write_surface_vtk,
    write_vertex_ascii_data,
};
use snapvtk_lib::writers::{CloudExportParameters, SurfaceExportParameters, TableExportParameters};
use snapvtk_lib::{
    Aabb3d, COORDINATOR_RANK, ExportError, Particle, ParticleCollection, Real, RealConvert,
    SamplingStrategy, TagSelection, ThreadComm, profile,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

static ARGS_IO: &str = "Input/output";
static ARGS_ATTRIBUTES: &str = "Particle attributes";
static ARGS_SELECTION: &str = "Selection and sampling";
static ARGS_MESH: &str = "Boundary mesh";
static ARGS_ADV: &str = "Advanced parameters";

/// Arguments shared by all export subcommands
#[derive(Clone, Debug, clap::Args)]
pub(crate) struct InputArgs {
    /// Path to the particle snapshot (supported formats: JSON, VTK, binary f32 XYZ), particles of VTK and XYZ files are tagged with their index
    #[arg(help_heading = ARGS_IO, value_parser = value_parser!(PathBuf))]
    pub input_file: PathBuf,
    /// Path of the output file, missing parent directories are created
    #[arg(help_heading = ARGS_IO, short = 'o', long, value_parser = value_parser!(PathBuf))]
    pub output_file: PathBuf,
    /// Number of participants the particles are distributed over (slabs along the longest axis of the particle bounding box), each participant runs on its own thread
    #[arg(
        help_heading = ARGS_ADV,
        short = 'p',
        long,
        default_value = "1",
        value_parser = value_parser!(u16).range(1..)
    )]
    pub participants: u16,
    /// Enable the use of double precision for all particle data
    #[arg(
        help_heading = ARGS_ADV,
        short = 'd',
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub double_precision: Switch,
}

/// Names and scale factors of the attributes written per mesh vertex
#[derive(Clone, Debug, clap::Args)]
pub(crate) struct AttributeArgs {
    /// Names of the scalar attributes to write, the i-th name refers to scalar slot i of the particles
    #[arg(help_heading = ARGS_ATTRIBUTES, long, value_delimiter = ',')]
    pub scalars: Vec<String>,
    /// Names of the vector attributes to write, the i-th name refers to vector slot i of the particles
    #[arg(help_heading = ARGS_ATTRIBUTES, long, value_delimiter = ',')]
    pub vectors: Vec<String>,
    /// Scale factors of the scalar attributes, either none or one per scalar name
    #[arg(
        help_heading = ARGS_ATTRIBUTES,
        long,
        value_delimiter = ',',
        allow_negative_numbers = true
    )]
    pub scalar_factors: Vec<f64>,
    /// Scale factors of the vector attributes, either none or one per vector name
    #[arg(
        help_heading = ARGS_ATTRIBUTES,
        long,
        value_delimiter = ',',
        allow_negative_numbers = true
    )]
    pub vector_factors: Vec<f64>,
}

impl AttributeArgs {
    fn factors<R: Real>(&self) -> Result<(Vec<R>, Vec<R>), anyhow::Error> {
        Ok((
            convert_factors(&self.scalar_factors)?,
            convert_factors(&self.vector_factors)?,
        ))
    }
}

/// Sampling strategy used when the number of particles exceeds the maximum count
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum SamplingArg {
    WithReplacement,
    WithoutReplacement,
}

impl From<SamplingArg> for SamplingStrategy {
    fn from(arg: SamplingArg) -> Self {
        match arg {
            SamplingArg::WithReplacement => SamplingStrategy::WithReplacement,
            SamplingArg::WithoutReplacement => SamplingStrategy::WithoutReplacement,
        }
    }
}

/// Command line arguments for the `cloud` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct CloudSubcommandArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Scalar attribute to write, given as SLOT=NAME (can be repeated, written in ascending slot order)
    #[arg(
        help_heading = ARGS_ATTRIBUTES,
        long = "scalar",
        value_name = "SLOT=NAME",
        value_parser = parse_slot_name
    )]
    pub scalars: Vec<(usize, String)>,
    /// Vector attribute to write, given as SLOT=NAME (can be repeated, default: 0=Velocity)
    #[arg(
        help_heading = ARGS_ATTRIBUTES,
        long = "vector",
        value_name = "SLOT=NAME",
        value_parser = parse_slot_name
    )]
    pub vectors: Vec<(usize, String)>,
    /// Do not write any vector attributes, e.g. for particle files without attributes
    #[arg(help_heading = ARGS_ATTRIBUTES, long, conflicts_with = "vectors")]
    pub no_vectors: bool,

    /// Maximum number of particles to write, a random sample is written if there are more particles (0: write all particles)
    #[arg(help_heading = ARGS_SELECTION, long, default_value = "0")]
    pub max_count: usize,
    /// Strategy used to draw the random sample
    #[arg(help_heading = ARGS_SELECTION, long, default_value = "with-replacement")]
    pub sampling: SamplingArg,
    /// Seed of the random number generator used for sampling (default: random seed)
    #[arg(help_heading = ARGS_SELECTION, long)]
    pub seed: Option<u64>,
    /// Only write particles with one of the given tags (no sampling is applied to selections)
    #[arg(
        help_heading = ARGS_SELECTION,
        long,
        value_delimiter = ',',
        allow_negative_numbers = true,
        conflicts_with_all = ["tag_min", "tag_max"]
    )]
    pub tags: Vec<i64>,
    /// Only write particles with a tag greater than or equal to this value
    #[arg(help_heading = ARGS_SELECTION, long, allow_negative_numbers = true)]
    pub tag_min: Option<i64>,
    /// Only write particles with a tag less than or equal to this value
    #[arg(help_heading = ARGS_SELECTION, long, allow_negative_numbers = true)]
    pub tag_max: Option<i64>,
    /// Lower corner of the domain of selected particles (default: bounding box of all particles, requires domain-max to be specified)
    #[arg(
        help_heading = ARGS_SELECTION,
        long,
        number_of_values = 3,
        value_names = ["X_MIN", "Y_MIN", "Z_MIN"],
        allow_negative_numbers = true,
        requires = "domain_max",
    )]
    pub domain_min: Option<Vec<f64>>,
    /// Upper corner of the domain of selected particles (default: bounding box of all particles, requires domain-min to be specified)
    #[arg(
        help_heading = ARGS_SELECTION,
        long,
        number_of_values = 3,
        value_names = ["X_MAX", "Y_MAX", "Z_MAX"],
        allow_negative_numbers = true,
        requires = "domain_min",
    )]
    pub domain_max: Option<Vec<f64>>,
}

impl CloudSubcommandArgs {
    fn parameters(&self) -> CloudExportParameters {
        let mut params = CloudExportParameters::default()
            .with_max_count(self.max_count)
            .with_sampling(self.sampling.into());
        params.scalars = self.scalars.iter().cloned().collect::<BTreeMap<_, _>>();
        if self.no_vectors {
            params.vectors.clear();
        } else if !self.vectors.is_empty() {
            params.vectors = self.vectors.iter().cloned().collect();
        }
        params
    }

    fn tag_selection(&self) -> TagSelection {
        if !self.tags.is_empty() {
            return TagSelection::OneOf(self.tags.clone());
        }
        match (self.tag_min, self.tag_max) {
            (Some(min), Some(max)) => TagSelection::Range(min..=max),
            (Some(min), None) => TagSelection::Range(min..=i64::MAX),
            (None, Some(max)) => TagSelection::Range(i64::MIN..=max),
            (None, None) => TagSelection::All,
        }
    }

    fn domain<R: Real>(&self) -> Result<Option<Aabb3d<R>>, anyhow::Error> {
        let (Some(min), Some(max)) = (&self.domain_min, &self.domain_max) else {
            return Ok(None);
        };

        let to_vector = |v: &[f64]| -> Result<Vector3<R>, anyhow::Error> {
            Vector3::new(v[0], v[1], v[2])
                .try_convert()
                .ok_or_else(|| anyhow!("Failed to convert domain corner {:?} to particle precision", v))
        };
        let domain = Aabb3d::new(to_vector(min)?, to_vector(max)?);
        if !domain.is_consistent() {
            return Err(anyhow!(
                "The domain min corner has to be smaller than the max corner in every dimension"
            ));
        }
        Ok(Some(domain))
    }
}

/// Command line arguments for the `surface` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct SurfaceSubcommandArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Path to the boundary mesh (supported formats: JSON, VTK), the tag of a particle is the index of its mesh vertex
    #[arg(help_heading = ARGS_MESH, short = 'b', long, value_parser = value_parser!(PathBuf))]
    pub boundary: PathBuf,
    #[command(flatten)]
    pub attributes: AttributeArgs,
    /// Write the mesh with the current vertex positions instead of the reference configuration
    #[arg(
        help_heading = ARGS_MESH,
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub dynamic_mesh: Switch,
    /// Only write the triangles with this region tag (negative: all triangles)
    #[arg(help_heading = ARGS_MESH, long, default_value = "-1", allow_negative_numbers = true)]
    pub region_tag: i64,
}

/// Command line arguments for the `table` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct TableSubcommandArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Path to the boundary mesh (supported formats: JSON, VTK), the number of particles has to match its number of vertices
    #[arg(help_heading = ARGS_MESH, short = 'b', long, value_parser = value_parser!(PathBuf))]
    pub boundary: PathBuf,
    #[command(flatten)]
    pub attributes: AttributeArgs,
    /// Use the dynamic variant of the boundary mesh
    #[arg(
        help_heading = ARGS_MESH,
        long,
        default_value = "off",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub dynamic_mesh: Switch,
    /// Write a header line with the column names
    #[arg(
        help_heading = ARGS_IO,
        long,
        default_value = "on",
        value_name = "off|on",
        ignore_case = true,
        require_equals = true
    )]
    pub header: Switch,
}

/// Command line arguments for the `positions` subcommand
#[derive(Clone, Debug, clap::Parser)]
pub(crate) struct PositionsSubcommandArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Parses a `SLOT=NAME` attribute mapping
fn parse_slot_name(value: &str) -> Result<(usize, String), String> {
    let (slot, name) = value
        .split_once('=')
        .ok_or_else(|| format!("expected SLOT=NAME but got \"{}\"", value))?;
    let slot = slot
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid attribute slot \"{}\": {}", slot, e))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!(
            "attribute name \"{}\" has to be non-empty and must not contain whitespace",
            name
        ));
    }
    Ok((slot, name.to_string()))
}

fn convert_factors<R: Real>(factors: &[f64]) -> Result<Vec<R>, anyhow::Error> {
    factors
        .iter()
        .map(|&f| {
            f.try_convert()
                .ok_or_else(|| anyhow!("Failed to convert factor {} to particle precision", f))
        })
        .collect()
}

/// Executes the `cloud` subcommand
pub(crate) fn cloud_subcommand(args: &CloudSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("cloud subcommand");
    if args.input.double_precision.into_bool() {
        export_cloud::<f64>(args)
    } else {
        export_cloud::<f32>(args)
    }
}

/// Executes the `surface` subcommand
pub(crate) fn surface_subcommand(args: &SurfaceSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("surface subcommand");
    if args.input.double_precision.into_bool() {
        export_surface::<f64>(args)
    } else {
        export_surface::<f32>(args)
    }
}

/// Executes the `table` subcommand
pub(crate) fn table_subcommand(args: &TableSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("table subcommand");
    if args.input.double_precision.into_bool() {
        export_table::<f64>(args)
    } else {
        export_table::<f32>(args)
    }
}

/// Executes the `positions` subcommand
pub(crate) fn positions_subcommand(args: &PositionsSubcommandArgs) -> Result<(), anyhow::Error> {
    profile!("positions subcommand");
    if args.input.double_precision.into_bool() {
        export_positions::<f64>(args)
    } else {
        export_positions::<f32>(args)
    }
}

fn export_cloud<R: Real>(args: &CloudSubcommandArgs) -> Result<(), anyhow::Error> {
    let snapshot = Snapshot::<R>::load(&args.input)?;
    let params = args.parameters();
    let output_file = &args.input.output_file;

    let written = match args.tag_selection() {
        TagSelection::All => {
            let seed = args.seed.unwrap_or_else(rand::random);
            info!("Sampling particles with seed {}.", seed);
            snapshot.run_participants(|comm, partition| {
                let mut rng = StdRng::seed_from_u64(seed);
                write_particle_vtk(comm, partition, &params, &mut rng, output_file)
            })?
        }
        selection => {
            if args.max_count > 0 {
                warn!("Selected particles are written without sampling, the maximum count is ignored.");
            }
            let domain = args
                .domain()?
                .unwrap_or_else(|| snapshot.bounding_box.clone());
            info!("Selecting particles with {:?} in domain {:?}.", selection, domain);
            snapshot.run_participants(|comm, partition| {
                write_selected_particle_vtk(comm, partition, &domain, &selection, &params, output_file)
            })?
        }
    };

    if let Some(written) = written {
        info!(
            "Exported {} particles to \"{}\".",
            written,
            output_file.display()
        );
    }
    Ok(())
}

fn export_surface<R: Real>(args: &SurfaceSubcommandArgs) -> Result<(), anyhow::Error> {
    let snapshot = Snapshot::<R>::load(&args.input)?;
    let boundary = io::read_boundary::<R, _>(&args.boundary).with_context(|| {
        format!(
            "Failed to load boundary mesh from file \"{}\"",
            args.boundary.display()
        )
    })?;

    let (scalar_factors, vector_factors) = args.attributes.factors()?;
    let params = SurfaceExportParameters::new(
        args.attributes.scalars.clone(),
        args.attributes.vectors.clone(),
    )
    .with_factors(scalar_factors, vector_factors)
    .with_dynamic_mesh(args.dynamic_mesh.into_bool())
    .with_region_tag(args.region_tag);

    snapshot.run_participants(|comm, partition| {
        let mut boundary = boundary.clone();
        write_surface_vtk(comm, partition, &mut boundary, &params, &args.input.output_file)
    })
}

fn export_table<R: Real>(args: &TableSubcommandArgs) -> Result<(), anyhow::Error> {
    let snapshot = Snapshot::<R>::load(&args.input)?;
    let boundary = io::read_boundary::<R, _>(&args.boundary).with_context(|| {
        format!(
            "Failed to load boundary mesh from file \"{}\"",
            args.boundary.display()
        )
    })?;

    let (scalar_factors, vector_factors) = args.attributes.factors()?;
    let params = TableExportParameters::new(
        args.attributes.scalars.clone(),
        args.attributes.vectors.clone(),
    )
    .with_factors(scalar_factors, vector_factors)
    .with_header(args.header.into_bool());
    let dynamic_mesh = args.dynamic_mesh.into_bool();

    snapshot.run_participants(|comm, partition| {
        let mut boundary = boundary.clone();
        write_vertex_ascii_data(
            comm,
            partition,
            &mut boundary,
            &params,
            dynamic_mesh,
            &args.input.output_file,
        )
    })
}

fn export_positions<R: Real>(args: &PositionsSubcommandArgs) -> Result<(), anyhow::Error> {
    let snapshot = Snapshot::<R>::load(&args.input)?;
    snapshot.run_participants(|comm, partition| {
        write_ascii_particle_pos(comm, partition, &args.input.output_file)
    })
}

/// Particle snapshot split into the partitions of the participants
struct Snapshot<R: Real> {
    bounding_box: Aabb3d<R>,
    partitions: Vec<ParticleCollection<R>>,
}

impl<R: Real> Snapshot<R> {
    fn load(input: &InputArgs) -> Result<Self, anyhow::Error> {
        let particles = io::read_particles::<R, _>(&input.input_file).with_context(|| {
            format!(
                "Failed to load particles from file \"{}\"",
                input.input_file.display()
            )
        })?;
        validate_particles(&particles)?;

        let positions = particles.par_iter().map(|p| p.position).collect::<Vec<_>>();
        let bounding_box = Aabb3d::par_from_points(&positions);
        info!("Bounding box of the particles: {:?}", bounding_box);

        let partitions = decompose(particles, &bounding_box, input.participants as usize);
        Ok(Self {
            bounding_box,
            partitions,
        })
    }

    /// Runs the export on one thread per participant and returns the result of the coordinator
    fn run_participants<T, F>(&self, export: F) -> Result<T, anyhow::Error>
    where
        T: Send,
        F: Fn(&ThreadComm, &ParticleCollection<R>) -> Result<T, ExportError> + Sync,
    {
        profile!("run participants");
        let group = ThreadComm::create_group(self.partitions.len());

        let results = std::thread::scope(|s| {
            let handles = group
                .into_iter()
                .zip(&self.partitions)
                .map(|(comm, partition)| {
                    let export = &export;
                    s.spawn(move || export(&comm, partition))
                })
                .collect::<Vec<_>>();
            handles.into_iter().map(|h| h.join()).collect::<Vec<_>>()
        });

        let mut coordinator_result = None;
        for (rank, result) in results.into_iter().enumerate() {
            let result = result
                .map_err(|_| anyhow!("Participant {} panicked during the export", rank))?
                .with_context(|| format!("Export failed on participant {}", rank))?;
            if rank == COORDINATOR_RANK {
                coordinator_result = Some(result);
            }
        }
        coordinator_result.ok_or_else(|| anyhow!("The export was run without any participant"))
    }
}

/// Checks in parallel that all particle data is finite
fn validate_particles<R: Real>(particles: &[Particle<R>]) -> Result<(), anyhow::Error> {
    profile!("validate particles");
    let is_finite = |v: &Vector3<R>| v.iter().all(|c| c.is_finite());
    let invalid = particles.par_iter().position_first(|p| {
        !is_finite(&p.position)
            || !p.scalars.iter().all(|s| s.is_finite())
            || !p.vectors.iter().all(is_finite)
    });

    match invalid {
        Some(i) => Err(anyhow!(
            "Particle {} (tag {}) has non-finite position or attributes",
            i,
            particles[i].tag
        )),
        None => Ok(()),
    }
}

/// Splits the particles into slabs of equal width along the longest axis of the bounding box
///
/// The relative order of the particles is preserved within each slab. Every partition covers the
/// whole bounding box as domain.
fn decompose<R: Real>(
    particles: Vec<Particle<R>>,
    bounding_box: &Aabb3d<R>,
    num_participants: usize,
) -> Vec<ParticleCollection<R>> {
    let num_participants = num_participants.max(1);
    let extents = bounding_box.extents();
    let axis = (1..3).fold(0, |longest, i| {
        if extents[i] > extents[longest] { i } else { longest }
    });
    let extent = extents[axis].to_f64().unwrap_or(0.0);
    let min = bounding_box.min()[axis];

    let mut slabs = (0..num_participants)
        .map(|_| Vec::new())
        .collect::<Vec<Vec<Particle<R>>>>();
    for particle in particles {
        let rank = if extent > 0.0 {
            let t = (particle.position[axis] - min).to_f64().unwrap_or(0.0) / extent;
            ((t * num_participants as f64) as usize).min(num_participants - 1)
        } else {
            COORDINATOR_RANK
        };
        slabs[rank].push(particle);
    }

    slabs
        .into_iter()
        .enumerate()
        .map(|(rank, slab)| {
            debug!("Participant {} owns {} particles.", rank, slab.len());
            ParticleCollection::from_particles(bounding_box.clone(), slab)
        })
        .collect()
}
