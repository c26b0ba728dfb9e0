//! Leaf type listing

use std::io::{self, Write};

use itertools::Itertools;

use crate::entry::Entry;

/// One line per leaf (`/module/path/leaf type`), sorted by path, followed by
/// a summary of the distinct type names in use.
pub fn render(out: &mut dyn Write, entries: &[Entry]) -> io::Result<()> {
    let mut leaves: Vec<(String, &str)> = Vec::new();
    for entry in entries {
        collect(entry, "", &mut leaves);
    }

    for (path, type_name) in leaves.iter().sorted() {
        writeln!(out, "{path} {type_name}")?;
    }

    let distinct: Vec<&str> = leaves
        .iter()
        .map(|(_, type_name)| *type_name)
        .unique()
        .sorted()
        .collect();
    writeln!(
        out,
        "{} leaves, {} distinct types: {}",
        leaves.len(),
        distinct.len(),
        distinct.join(", ")
    )
}

fn collect<'a>(entry: &'a Entry, prefix: &str, leaves: &mut Vec<(String, &'a str)>) {
    let path = format!("{prefix}/{}", entry.name);
    if entry.is_leaf() {
        if let Some(type_name) = entry.type_name.as_deref() {
            leaves.push((path, type_name));
        }
        return;
    }
    for child in &entry.children {
        collect(child, &path, leaves);
    }
}
