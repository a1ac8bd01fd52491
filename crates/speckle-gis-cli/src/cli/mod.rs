//! CLI module for the Speckle GIS tools
//!
//! Command-line access to attribute reconciliation, project settings and
//! release patching.

pub mod commands;
pub mod output;

pub use commands::{GisCli, GisCommands, ProjectCommands};
pub use output::OutputFormat;

use crate::error::CliError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful execution
    Success = 0,
    /// Some records could not be assembled
    RecordsSkipped = 1,
    /// Completed, but warnings were logged
    Warnings = 2,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Schema or settings could not be loaded
    SchemaError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code from a command's outcome
    pub fn from_run_result(has_skipped: bool, has_warnings: bool) -> Self {
        if has_skipped {
            ExitCode::RecordsSkipped
        } else if has_warnings {
            ExitCode::Warnings
        } else {
            ExitCode::Success
        }
    }

    /// Exit code for a command that failed
    pub fn from_error(error: &CliError) -> Self {
        match error {
            CliError::FileError(_) => ExitCode::FileError,
            CliError::Config(_) | CliError::ParseError(_) => ExitCode::SchemaError,
            e if e.is_user_error() => ExitCode::InvalidInput,
            _ => ExitCode::InternalError,
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub fn run(cli: GisCli) -> Result<ExitCode, CliError> {
    match cli.command {
        GisCommands::Reconcile {
            schema,
            records,
            config,
            format,
            report,
        } => commands::execute_reconcile(schema, records, config, format, report),
        GisCommands::Classify { input, format } => commands::execute_classify(input, format),
        GisCommands::Flatten {
            input,
            root,
            config,
            format,
        } => commands::execute_flatten(input, root, config, format),
        GisCommands::Heights {
            records,
            layer,
            transforms,
            geographic,
            seed,
            format,
        } => commands::execute_heights(records, layer, transforms, geographic, seed, format),
        GisCommands::Project {
            project,
            format,
            command,
        } => commands::execute_project(project, command, format),
        GisCommands::PatchVersion {
            tag,
            root,
            targets,
            format,
        } => commands::execute_patch_version(tag, root, targets, format),
    }
}
