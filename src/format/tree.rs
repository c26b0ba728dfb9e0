//! Default tree-style rendering via termtree

use std::io::{self, Write};

use termtree::Tree;

use crate::entry::{Entry, EntryKind};

pub fn render(out: &mut dyn Write, entries: &[Entry]) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}", to_tree(entry))?;
    }
    Ok(())
}

fn to_tree(entry: &Entry) -> Tree<String> {
    Tree::new(label(entry)).with_leaves(entry.children.iter().map(to_tree))
}

fn label(entry: &Entry) -> String {
    match entry.kind {
        EntryKind::Module => format!("module: {}", entry.name),
        EntryKind::Container => match &entry.presence {
            Some(_) => format!("{}!", entry.name),
            None => entry.name.clone(),
        },
        EntryKind::List => match &entry.keys {
            Some(keys) => format!("{}* [{keys}]", entry.name),
            None => format!("{}*", entry.name),
        },
        EntryKind::Leaf => match &entry.type_name {
            Some(type_name) => format!("{} ({type_name})", entry.name),
            None => entry.name.clone(),
        },
        EntryKind::LeafList => match &entry.type_name {
            Some(type_name) => format!("{}* ({type_name})", entry.name),
            None => format!("{}*", entry.name),
        },
        EntryKind::Choice => format!("({})", entry.name),
        EntryKind::Case => format!(":({})", entry.name),
    }
}
