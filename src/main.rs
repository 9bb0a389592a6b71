//! Command-line entry point: read a manifest, write its outputs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Trace Python import graphs and generate annotated requirement manifests.
#[derive(Debug, Parser)]
#[command(name = "reqtrace", version, about)]
struct Cli {
    /// Path to the pyproject.toml holding the [tool.reqtrace] section.
    #[arg(default_value = "pyproject.toml")]
    manifest: PathBuf,

    /// Log filter, e.g. `debug` or `reqtrace=trace`.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match reqtrace::run(&cli.manifest) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
