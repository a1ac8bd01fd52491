//! Speckle GIS CLI
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Some records could not be assembled
//! - 2: Completed with warnings
//! - 3: Invalid input or arguments
//! - 4: File not found or inaccessible
//! - 5: Schema or settings could not be loaded
//! - 10: Internal error

use clap::Parser;
use speckle_gis_cli::{run_cli, ExitCode, GisCli};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logs go to stderr so JSON and YAML results on stdout stay parseable
fn init_tracing(cli: &GisCli) -> anyhow::Result<()> {
    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if cli.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }
    Ok(())
}

fn main() {
    let cli = GisCli::parse();

    if let Err(e) = init_tracing(&cli) {
        eprintln!("Error: failed to initialise logging: {}", e);
        std::process::exit(ExitCode::InternalError.into());
    }

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
