//! CLI-level errors (wraps schema-library errors)

use thiserror::Error;

use crate::config::SettingsError;
use crate::errors::SchemaError;
use crate::exitcode;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("invalid format '{requested}': choices are {choices}")]
    InvalidFormat { requested: String, choices: String },

    #[error("failed to read standard input: {0}")]
    Stdin(std::io::Error),

    #[error("render failed: {0}")]
    Render(std::io::Error),

    /// A batch of load or processing errors; displays one per line.
    #[error("{}", format_batch(.0))]
    Batch(Vec<SchemaError>),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        exitcode::FAILURE
    }
}

fn format_batch(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
