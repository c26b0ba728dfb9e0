//! Display-ready entry trees derived from processed modules

use std::collections::BTreeMap;

use serde::Serialize;

use crate::module::{Module, ModuleKind};
use crate::modules::ModuleSet;
use crate::parser::Statement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Module,
    Container,
    List,
    Leaf,
    LeafList,
    Choice,
    Case,
}

/// One node of the resolved tree handed to formatters.
///
/// Children keep declaration order; only the top-level entry sequence
/// produced by [`resolve_entries`] is name-sorted.
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mandatory: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Entry>,
}

impl Entry {
    fn new(name: &str, kind: EntryKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            type_name: None,
            description: None,
            keys: None,
            mandatory: None,
            config: None,
            presence: None,
            default: None,
            children: Vec::new(),
        }
    }

    /// True for nodes without children in the data tree sense.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, EntryKind::Leaf | EntryKind::LeafList)
    }
}

/// Convert one processed module into its entry tree.
pub fn to_entry(module: &Module) -> Entry {
    let mut root = Entry::new(&module.name, EntryKind::Module);
    root.description = module.description.clone();
    root.children = module.body.iter().filter_map(node_entry).collect();
    root
}

/// The deduplicated, name-sorted entry sequence for every top-level module
/// in the set. The first-loaded record wins for a repeated name.
pub fn resolve_entries(set: &ModuleSet) -> Vec<Entry> {
    let mut picked: BTreeMap<&str, &Module> = BTreeMap::new();
    for module in set.modules() {
        if module.kind == ModuleKind::Module {
            picked.entry(module.name.as_str()).or_insert(module);
        }
    }
    picked.values().map(|module| to_entry(module)).collect()
}

fn node_entry(stmt: &Statement) -> Option<Entry> {
    let kind = match stmt.keyword.as_str() {
        "container" => EntryKind::Container,
        "list" => EntryKind::List,
        "leaf" => EntryKind::Leaf,
        "leaf-list" => EntryKind::LeafList,
        "choice" => EntryKind::Choice,
        "case" => EntryKind::Case,
        _ => return None,
    };
    let name = stmt.argument.as_deref()?;

    let mut entry = Entry::new(name, kind);
    entry.type_name = stmt.child_arg("type").map(str::to_string);
    entry.description = stmt.child_arg("description").map(str::to_string);
    entry.keys = stmt.child_arg("key").map(str::to_string);
    entry.mandatory = stmt.child_arg("mandatory").map(|v| v == "true");
    entry.config = stmt.child_arg("config").map(|v| v == "true");
    entry.default = stmt.child_arg("default").map(str::to_string);
    if let Some(presence) = stmt.child("presence") {
        entry.presence = Some(
            presence
                .argument
                .clone()
                .unwrap_or_else(|| name.to_string()),
        );
    }
    entry.children = stmt.children.iter().filter_map(node_entry).collect();
    Some(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::ModuleSet;

    fn processed_set(sources: &[(&str, &str)]) -> ModuleSet {
        let mut set = ModuleSet::new(Vec::new());
        for (name, text) in sources {
            set.parse(text, name).unwrap();
        }
        let errors = set.process();
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        set
    }

    #[test]
    fn test_to_entry_maps_node_properties() {
        let set = processed_set(&[(
            "box.sdl",
            r#"module box {
                namespace "urn:box";
                prefix bx;
                container top {
                    list item {
                        key id;
                        leaf id { type string; }
                        leaf count { type uint32; mandatory true; }
                    }
                }
            }"#,
        )]);
        let entry = to_entry(set.find_module("box").unwrap());
        assert_eq!(entry.kind, EntryKind::Module);
        let top = &entry.children[0];
        assert_eq!(top.kind, EntryKind::Container);
        let item = &top.children[0];
        assert_eq!(item.kind, EntryKind::List);
        assert_eq!(item.keys.as_deref(), Some("id"));
        let count = &item.children[1];
        assert_eq!(count.type_name.as_deref(), Some("uint32"));
        assert_eq!(count.mandatory, Some(true));
        assert!(count.is_leaf());
    }

    #[test]
    fn test_resolve_entries_sorts_and_dedups() {
        let set = processed_set(&[
            (
                "z.sdl",
                "module zeta { namespace \"urn:z\"; prefix z; leaf z1 { type string; } }",
            ),
            (
                "a.sdl",
                "module alpha { namespace \"urn:a\"; prefix a; leaf a1 { type string; } }",
            ),
            (
                "z2.sdl",
                "module zeta { namespace \"urn:z2\"; prefix z2; leaf other { type string; } }",
            ),
        ]);
        let entries = resolve_entries(&set);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        // first-loaded zeta wins
        assert_eq!(entries[1].children[0].name, "z1");
    }
}
