//! Pluggable output formats and their registry

pub mod json;
pub mod tree;
pub mod types;

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::entry::Entry;

/// Name of the format used when none is configured.
pub const DEFAULT_FORMAT: &str = "tree";

pub type RenderFn = fn(&mut dyn Write, &[Entry]) -> io::Result<()>;

/// One registered output format: a unique name, one-line help text, and the
/// rendering function invoked with the output sink and the ordered entry
/// sequence.
pub struct Formatter {
    pub name: &'static str,
    pub help: &'static str,
    pub render: RenderFn,
}

/// Registry mapping format names to formatters.
///
/// Insertion is last-write-wins: registering under an existing name replaces
/// the earlier formatter without complaint. The registry is populated once at
/// startup and read-only while the pipeline runs.
#[derive(Default)]
pub struct FormatterRegistry {
    formatters: BTreeMap<&'static str, Formatter>,
}

impl FormatterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, formatter: Formatter) {
        self.formatters.insert(formatter.name, formatter);
    }

    pub fn lookup(&self, name: &str) -> Option<&Formatter> {
        self.formatters.get(name)
    }

    /// Registered format names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.formatters.keys().copied().collect()
    }

    /// Name-sorted iteration for help/usage display.
    pub fn iter(&self) -> impl Iterator<Item = &Formatter> {
        self.formatters.values()
    }

    /// The `name - help` listing appended to `--help` output.
    pub fn help_listing(&self) -> String {
        let mut listing = String::from("Formats:\n");
        for formatter in self.iter() {
            listing.push_str(&format!("    {} - {}\n", formatter.name, formatter.help));
        }
        listing
    }
}

/// Construct the registry with the built-in formats, the same way external
/// format plugins would register theirs at startup.
pub fn builtin_registry() -> FormatterRegistry {
    let mut registry = FormatterRegistry::new();
    registry.register(Formatter {
        name: "tree",
        help: "display the schema as an indented tree",
        render: tree::render,
    });
    registry.register(Formatter {
        name: "types",
        help: "list every leaf path with its type",
        render: types::render,
    });
    registry.register(Formatter {
        name: "json",
        help: "emit the entry trees as pretty-printed JSON",
        render: json::render,
    });
    registry
}
