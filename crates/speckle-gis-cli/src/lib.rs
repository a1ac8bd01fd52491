//! Speckle GIS CLI
//!
//! Command-line tools around the Speckle GIS connector.
//!
//! ## Commands
//!
//! ```bash
//! # Build feature records for a schema from Speckle objects
//! speckle-gis reconcile --schema layer.yaml --records objects.json --report
//!
//! # Inspect how a nested attribute flattens
//! speckle-gis flatten --input parameters.json --root parameters --format json
//!
//! # Manage the Speckle settings saved with a project
//! speckle-gis project --project Campus.aprx add-stream https://speckle.xyz/streams/3073b96e86
//! speckle-gis project --project Campus.aprx set-survey-point 51.5 -0.12
//!
//! # Stamp a release tag into installer and packaging files
//! speckle-gis patch-version 2.14.1-beta --root .
//! ```

pub mod cli;
pub mod error;
pub mod patch;

pub use cli::{ExitCode, GisCli, GisCommands, OutputFormat, ProjectCommands};
pub use error::{CliError, Result};
pub use patch::{patch_release, PatchTargets, PatchedFile, ReleaseTag};

/// Run the CLI and map failures to exit codes
///
/// ```rust,no_run
/// use clap::Parser;
/// use speckle_gis_cli::{run_cli, GisCli};
///
/// let exit_code = run_cli(GisCli::parse());
/// std::process::exit(exit_code.into());
/// ```
pub fn run_cli(cli: GisCli) -> ExitCode {
    match cli::run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from_error(&e)
        }
    }
}
