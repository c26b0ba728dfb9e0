//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use clap_complete::Shell;

/// Parse schema modules, display errors, and render the resulting trees
#[derive(Parser, Debug)]
#[command(name = "schemaview")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// MODULE to display (an argument not ending in .sdl), or schema FILEs
    /// to parse; with no arguments standard input is parsed
    #[arg(value_name = "MODULE|FILE", value_hint = ValueHint::FilePath)]
    pub args: Vec<String>,

    /// Comma-separated list of directories to add to the search path
    #[arg(long, value_delimiter = ',', value_name = "PATH")]
    pub path: Vec<String>,

    /// Format to display; registered formats are listed below
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// File to write an execution trace into
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub trace: Option<PathBuf>,

    /// Enable verbose output (-d, -dd, -ddd)
    #[arg(short = 'd', long = "debug", action = ArgAction::Count)]
    pub debug: u8,

    /// Generate shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    pub completions: Option<Shell>,
}
