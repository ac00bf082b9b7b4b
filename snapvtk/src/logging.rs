use std::env;
use std::str::FromStr;

use anyhow::anyhow;
use log::{LevelFilter, error, info};

use crate::cli::VerbosityLevel;

/// Prints an anyhow error and its full error chain using the log::error macro
pub(crate) fn log_error(err: &anyhow::Error) {
    error!("Error occurred: {}", err);
    err.chain()
        .skip(1)
        .for_each(|cause| error!("  caused by: {}", cause));
}

/// Selects the log filter level, returns the value of `RUST_LOG` as well if it could not be parsed
///
/// Quiet mode takes precedence over the verbosity level which takes precedence over `RUST_LOG`.
fn select_filter_level(
    verbosity: VerbosityLevel,
    quiet_mode: bool,
    env_level: Option<&str>,
) -> (LevelFilter, Option<String>) {
    if quiet_mode {
        return (LevelFilter::Off, None);
    }
    if let Some(level) = verbosity.into_filter() {
        return (level, None);
    }
    match env_level.map(str::trim) {
        Some(level) => match LevelFilter::from_str(level) {
            Ok(level) => (level, None),
            Err(_) => (LevelFilter::Info, Some(level.to_string())),
        },
        None => (LevelFilter::Info, None),
    }
}

/// Initializes logging to stdout with fern
pub(crate) fn initialize_logging(
    verbosity: VerbosityLevel,
    quiet_mode: bool,
) -> Result<(), anyhow::Error> {
    let env_level = env::var("RUST_LOG").ok();
    let (filter_level, unknown_level) =
        select_filter_level(verbosity, quiet_mode, env_level.as_deref());
    let detailed = !matches!(verbosity, VerbosityLevel::None);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            if detailed {
                out.finish(format_args!(
                    "[{}][{}][{}] {}",
                    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false),
                    record.target(),
                    record.level(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{}][{}] {}",
                    chrono::Local::now().format("%T%.3f"),
                    record.level(),
                    message
                ))
            }
        })
        .level(filter_level)
        .chain(std::io::stdout())
        .apply()
        .map_err(|e| anyhow!("Unable to apply logger configuration ({:?})", e))?;

    if let Some(level) = unknown_level {
        error!(
            "Unknown log filter level '{}' defined in 'RUST_LOG' env variable, using INFO instead.",
            level
        );
    }

    Ok(())
}

/// Prints program name, version and the command line to the log
pub(crate) fn log_program_info() {
    info!(
        "{} v{} ({})",
        env::args().next().unwrap_or_else(|| "snapvtk".to_string()),
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_NAME")
    );
    info!(
        "Called with command line: {}",
        env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Rayon thread pool uses {} threads.", rayon::current_num_threads());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_level_precedence() {
        assert_eq!(
            select_filter_level(VerbosityLevel::VeryVerbose, true, Some("trace")),
            (LevelFilter::Off, None)
        );
        assert_eq!(
            select_filter_level(VerbosityLevel::VeryVerbose, false, Some("trace")),
            (LevelFilter::Debug, None)
        );
        assert_eq!(
            select_filter_level(VerbosityLevel::None, false, Some("WARN")),
            (LevelFilter::Warn, None)
        );
        assert_eq!(
            select_filter_level(VerbosityLevel::None, false, None),
            (LevelFilter::Info, None)
        );
    }

    #[test]
    fn test_unknown_env_level() {
        assert_eq!(
            select_filter_level(VerbosityLevel::None, false, Some("loud")),
            (LevelFilter::Info, Some("loud".to_string()))
        );
    }
}
