//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::cli::error::CliError;

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print a diagnostic line verbatim (no prefix) to stderr
pub fn diagnostic(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{msg}");
}

/// Report a terminal error: batches print one diagnostic per line, single
/// errors get the `error:` prefix.
pub fn report(err: &CliError) {
    match err {
        CliError::Batch(errors) => {
            for e in errors {
                diagnostic(e);
            }
        }
        other => error(other),
    }
}
