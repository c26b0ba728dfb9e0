//! Typed module records extracted from parsed statements

use crate::errors::{SchemaError, SchemaResult};
use crate::parser::Statement;

/// Statement keywords that define data nodes inside a module body.
pub const DATA_KEYWORDS: &[&str] = &[
    "container",
    "list",
    "leaf",
    "leaf-list",
    "choice",
    "case",
    "uses",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Submodule,
}

/// `import NAME { prefix P; }`
#[derive(Debug, Clone)]
pub struct Import {
    pub module: String,
    pub prefix: String,
    pub line: usize,
}

/// `include NAME;`
#[derive(Debug, Clone)]
pub struct Include {
    pub submodule: String,
    pub line: usize,
}

/// `typedef NAME { type BASE; }`
#[derive(Debug, Clone)]
pub struct Typedef {
    pub name: String,
    pub base: String,
    pub line: usize,
}

/// `grouping NAME { ... }`, body kept raw for `uses` expansion.
#[derive(Debug, Clone)]
pub struct Grouping {
    pub name: String,
    pub body: Vec<Statement>,
    pub line: usize,
}

/// `revision DATE { ... }`
#[derive(Debug, Clone)]
pub struct Revision {
    pub date: String,
    pub line: usize,
}

/// One named schema definition parsed from one source.
///
/// Header statements are extracted into typed fields; the data definition
/// body stays as raw statements until the semantic pass has expanded
/// groupings and applied augments.
#[derive(Debug, Clone)]
pub struct Module {
    pub kind: ModuleKind,
    pub name: String,
    pub source_name: String,
    pub line: usize,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub belongs_to: Option<String>,
    pub description: Option<String>,
    pub revisions: Vec<Revision>,
    pub imports: Vec<Import>,
    pub includes: Vec<Include>,
    pub typedefs: Vec<Typedef>,
    pub groupings: Vec<Grouping>,
    pub body: Vec<Statement>,
}

impl Module {
    /// Build a typed module from a top-level `module`/`submodule` statement.
    ///
    /// Structural problems in header statements (a missing name, an import
    /// without a prefix) fail the whole source, like any other parse error.
    /// Statements that are not recognized here are kept in the body for the
    /// semantic pass to judge.
    pub fn from_statement(stmt: Statement, source_name: &str) -> SchemaResult<Module> {
        let kind = match stmt.keyword.as_str() {
            "module" => ModuleKind::Module,
            "submodule" => ModuleKind::Submodule,
            _ => {
                return Err(SchemaError::Parse {
                    source_name: source_name.to_string(),
                    line: stmt.line,
                    message: format!("expected 'module' or 'submodule', found '{}'", stmt.keyword),
                })
            }
        };
        let name = stmt.require_arg(source_name)?.to_string();

        let mut module = Module {
            kind,
            name,
            source_name: source_name.to_string(),
            line: stmt.line,
            namespace: None,
            prefix: None,
            belongs_to: None,
            description: None,
            revisions: Vec::new(),
            imports: Vec::new(),
            includes: Vec::new(),
            typedefs: Vec::new(),
            groupings: Vec::new(),
            body: Vec::new(),
        };

        for child in stmt.children {
            match child.keyword.as_str() {
                "namespace" => module.namespace = Some(child.require_arg(source_name)?.to_string()),
                "prefix" => module.prefix = Some(child.require_arg(source_name)?.to_string()),
                "description" => {
                    module.description = Some(child.require_arg(source_name)?.to_string())
                }
                "belongs-to" => {
                    module.belongs_to = Some(child.require_arg(source_name)?.to_string())
                }
                "revision" => module.revisions.push(Revision {
                    date: child.require_arg(source_name)?.to_string(),
                    line: child.line,
                }),
                "import" => {
                    let target = child.require_arg(source_name)?.to_string();
                    let prefix = child.child_arg("prefix").ok_or_else(|| SchemaError::Parse {
                        source_name: source_name.to_string(),
                        line: child.line,
                        message: format!("import of '{target}' requires a prefix substatement"),
                    })?;
                    module.imports.push(Import {
                        module: target,
                        prefix: prefix.to_string(),
                        line: child.line,
                    });
                }
                "include" => module.includes.push(Include {
                    submodule: child.require_arg(source_name)?.to_string(),
                    line: child.line,
                }),
                "typedef" => {
                    let name = child.require_arg(source_name)?.to_string();
                    let base = child.child_arg("type").ok_or_else(|| SchemaError::Parse {
                        source_name: source_name.to_string(),
                        line: child.line,
                        message: format!("typedef '{name}' requires a type substatement"),
                    })?;
                    module.typedefs.push(Typedef {
                        name,
                        base: base.to_string(),
                        line: child.line,
                    });
                }
                "grouping" => {
                    let name = child.require_arg(source_name)?.to_string();
                    module.groupings.push(Grouping {
                        name,
                        body: child.children,
                        line: child.line,
                    });
                }
                // Metadata kept out of the model.
                "organization" | "contact" | "reference" => {}
                _ => module.body.push(child),
            }
        }

        Ok(module)
    }

    /// Most recent revision (by convention the first listed).
    pub fn revision(&self) -> Option<&str> {
        self.revisions.first().map(|r| r.date.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    fn module_from(text: &str) -> SchemaResult<Module> {
        let mut stmts = parser::parse("test.sdl", text)?;
        Module::from_statement(stmts.remove(0), "test.sdl")
    }

    #[test]
    fn test_header_extraction() {
        let module = module_from(
            r#"module box {
                namespace "urn:box";
                prefix bx;
                revision 2024-05-01;
                import other { prefix ot; }
                include box-types;
                typedef percent { type uint8; }
                grouping common { leaf id { type string; } }
                container top { }
            }"#,
        )
        .unwrap();
        assert_eq!(module.kind, ModuleKind::Module);
        assert_eq!(module.name, "box");
        assert_eq!(module.prefix.as_deref(), Some("bx"));
        assert_eq!(module.revision(), Some("2024-05-01"));
        assert_eq!(module.imports[0].prefix, "ot");
        assert_eq!(module.includes[0].submodule, "box-types");
        assert_eq!(module.typedefs[0].base, "uint8");
        assert_eq!(module.groupings[0].name, "common");
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn test_import_without_prefix_fails() {
        let err = module_from("module a { import b; }").unwrap_err();
        assert!(err.to_string().contains("requires a prefix"));
    }

    #[test]
    fn test_submodule_belongs_to() {
        let module =
            module_from("submodule a-parts { belongs-to a { prefix a; } }").unwrap();
        assert_eq!(module.kind, ModuleKind::Submodule);
        assert_eq!(module.belongs_to.as_deref(), Some("a"));
    }
}
