//! Pipeline execution: input resolution, loading, processing, dispatch

use std::io::{Read, Write};
use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::cli::args::Cli;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{expand_path, Settings};
use crate::entry::{self, Entry};
use crate::format::{FormatterRegistry, DEFAULT_FORMAT};
use crate::modules::{ModuleSet, SCHEMA_EXT};

/// How the positional arguments select input sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRequest {
    /// Display one named module, parsing auxiliary files first.
    Module {
        name: String,
        aux_files: Vec<PathBuf>,
    },
    /// Parse exactly these files and display everything top-level in them.
    Files(Vec<PathBuf>),
    /// Parse standard input as a single anonymous source.
    Stdin,
}

impl InputRequest {
    /// Classify the positional arguments, once: a first argument that does
    /// not end in the schema extension names a module to display; otherwise
    /// the arguments are files, and no arguments at all means stdin.
    pub fn classify(args: &[String]) -> InputRequest {
        let suffix = format!(".{SCHEMA_EXT}");
        match args.split_first() {
            None => InputRequest::Stdin,
            Some((first, rest)) if !first.ends_with(&suffix) => InputRequest::Module {
                name: first.clone(),
                aux_files: rest.iter().map(PathBuf::from).collect(),
            },
            Some(_) => InputRequest::Files(args.iter().map(PathBuf::from).collect()),
        }
    }
}

/// Execute one full pipeline run.
///
/// Rendered output goes to `out`; `input` is only consumed when the request
/// resolves to stdin. The registry and settings are read-only here, so the
/// pipeline is re-entrant for tests.
#[instrument(level = "debug", skip_all)]
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    registry: &FormatterRegistry,
    input: &mut dyn Read,
    out: &mut dyn Write,
) -> CliResult<()> {
    // Validate the requested format before any input is read.
    let format_name = cli
        .format
        .as_deref()
        .or(settings.format.as_deref())
        .unwrap_or(DEFAULT_FORMAT);
    let formatter = registry
        .lookup(format_name)
        .ok_or_else(|| CliError::InvalidFormat {
            requested: format_name.to_string(),
            choices: registry.names().join(", "),
        })?;

    let mut search_path = settings.search_path();
    search_path.extend(cli.path.iter().map(|p| expand_path(p)));
    debug!(?search_path, format = format_name, "pipeline start");

    let mut set = ModuleSet::new(search_path);
    let entries = load(&mut set, InputRequest::classify(&cli.args), input)?;

    (formatter.render)(out, &entries).map_err(CliError::Render)
}

#[instrument(level = "debug", skip(set, input))]
fn load(
    set: &mut ModuleSet,
    request: InputRequest,
    input: &mut dyn Read,
) -> CliResult<Vec<Entry>> {
    match request {
        InputRequest::Module { name, aux_files } => {
            let module = set
                .get_module(&name, &aux_files)
                .map_err(CliError::Batch)?;
            Ok(vec![entry::to_entry(module)])
        }
        InputRequest::Files(files) => {
            for file in &files {
                // One malformed file must not prevent inspection of the others.
                if let Err(e) = set.read(file) {
                    output::error(&e);
                }
            }
            process_and_resolve(set)
        }
        InputRequest::Stdin => {
            let mut text = String::new();
            input.read_to_string(&mut text).map_err(CliError::Stdin)?;
            set.parse(&text, "<STDIN>")?;
            process_and_resolve(set)
        }
    }
}

/// The single semantic processing call, then entry resolution.
fn process_and_resolve(set: &mut ModuleSet) -> CliResult<Vec<Entry>> {
    let errors = set.process();
    if !errors.is_empty() {
        return Err(CliError::Batch(errors));
    }
    Ok(entry::resolve_entries(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::empty(&[], InputRequest::Stdin)]
    #[case::single_file(&["a.sdl"], InputRequest::Files(vec![PathBuf::from("a.sdl")]))]
    #[case::module(&["box"], InputRequest::Module { name: "box".into(), aux_files: vec![] })]
    #[case::module_with_aux(
        &["box", "aux.sdl"],
        InputRequest::Module { name: "box".into(), aux_files: vec![PathBuf::from("aux.sdl")] }
    )]
    #[case::files(
        &["a.sdl", "b.sdl"],
        InputRequest::Files(vec![PathBuf::from("a.sdl"), PathBuf::from("b.sdl")])
    )]
    fn test_classify(#[case] input: &[&str], #[case] expected: InputRequest) {
        assert_eq!(InputRequest::classify(&args(input)), expected);
    }
}
