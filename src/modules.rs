//! Model-set accumulation and the cross-source semantic pass

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::errors::{SchemaError, SchemaResult};
use crate::module::{Grouping, Module, ModuleKind, Typedef, DATA_KEYWORDS};
use crate::parser::{self, Statement};

/// File extension of schema sources.
pub const SCHEMA_EXT: &str = "sdl";

/// Conventional file consulted when a requested module was not among the
/// explicitly loaded sources.
pub const FALLBACK_MODULES_FILE: &str = "MODULES.sdl";

/// Built-in type names; everything else must resolve through a typedef.
const BUILTIN_TYPES: &[&str] = &[
    "binary",
    "boolean",
    "decimal64",
    "empty",
    "enumeration",
    "int8",
    "int16",
    "int32",
    "int64",
    "leafref",
    "string",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "union",
];

/// Property substatements permitted inside data nodes.
const NODE_PROPERTY_KEYWORDS: &[&str] = &[
    "config",
    "default",
    "description",
    "key",
    "mandatory",
    "max-elements",
    "min-elements",
    "ordered-by",
    "presence",
    "reference",
    "status",
    "type",
    "units",
    "when",
];

type GroupingTable = HashMap<(String, String), Vec<Statement>>;
type TypedefTable = HashMap<(String, String), String>;
type PrefixTables = HashMap<String, HashMap<String, String>>;

/// Accumulator for parsed modules and submodules of one run.
///
/// Sources are added incrementally with [`parse`](Self::parse) and
/// [`read`](Self::read); [`process`](Self::process) then performs the single
/// cross-source semantic pass. Duplicate module names are tolerated at load
/// time; lookups return the first-loaded record.
pub struct ModuleSet {
    search_path: Vec<PathBuf>,
    modules: Vec<Module>,
    revision_re: Regex,
    processed: bool,
}

impl ModuleSet {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            modules: Vec::new(),
            revision_re: Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap(),
            processed: false,
        }
    }

    /// All loaded records in load order.
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// First-loaded module with the given name.
    pub fn find_module(&self, name: &str) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.kind == ModuleKind::Module && m.name == name)
    }

    /// First-loaded submodule with the given name.
    pub fn find_submodule(&self, name: &str) -> Option<&Module> {
        self.modules
            .iter()
            .find(|m| m.kind == ModuleKind::Submodule && m.name == name)
    }

    /// Parse one source's text and accumulate its modules.
    #[instrument(level = "debug", skip(self, text))]
    pub fn parse(&mut self, text: &str, source_name: &str) -> SchemaResult<()> {
        let statements = parser::parse(source_name, text)?;
        if statements.is_empty() {
            return Err(SchemaError::Parse {
                source_name: source_name.to_string(),
                line: 1,
                message: "no module or submodule found".to_string(),
            });
        }
        for stmt in statements {
            let module = Module::from_statement(stmt, source_name)?;
            debug!(name = %module.name, source = %source_name, "loaded");
            self.modules.push(module);
        }
        Ok(())
    }

    /// Read and parse one file, resolving it against the search path when it
    /// does not exist as given.
    #[instrument(level = "debug", skip(self))]
    pub fn read(&mut self, file: &Path) -> SchemaResult<()> {
        let path = self.resolve_file(file)?;
        let text = fs::read_to_string(&path).map_err(|e| SchemaError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        let source_name = path.display().to_string();
        self.parse(&text, &source_name)
    }

    /// The named-module entry point: parse the auxiliary files, then make
    /// sure `name` is present, falling back to the conventional
    /// `MODULES.sdl`, then run the semantic pass.
    ///
    /// Any failure here is a terminal batch; the partial-failure tolerance of
    /// file-list loading does not apply.
    #[instrument(level = "debug", skip(self))]
    pub fn get_module(&mut self, name: &str, files: &[PathBuf]) -> Result<&Module, Vec<SchemaError>> {
        let mut errors = Vec::new();
        for file in files {
            if let Err(e) = self.read(file) {
                errors.push(e);
            }
        }

        if self.find_module(name).is_none() {
            // The conventional file is optional; its absence only matters if
            // the module stays unresolved.
            match self.read(Path::new(FALLBACK_MODULES_FILE)) {
                Ok(()) => debug!("loaded {FALLBACK_MODULES_FILE}"),
                Err(e) => debug!(error = %e, "no usable {FALLBACK_MODULES_FILE}"),
            }
        }
        if self.find_module(name).is_none() {
            errors.push(SchemaError::ModuleNotFound(name.to_string()));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        let errors = self.process();
        if !errors.is_empty() {
            return Err(errors);
        }
        match self.find_module(name) {
            Some(module) => Ok(module),
            None => Err(vec![SchemaError::ModuleNotFound(name.to_string())]),
        }
    }

    /// The single cross-source semantic pass.
    ///
    /// Loads missing dependencies from the search path, merges submodules
    /// into their owners, expands groupings, applies augments, and resolves
    /// type references. Returns every error found; an empty batch means the
    /// set is ready for entry conversion. Invoking this more than once per
    /// set is not a supported contract.
    #[instrument(level = "debug", skip(self))]
    pub fn process(&mut self) -> Vec<SchemaError> {
        if self.processed {
            warn!("process() invoked more than once on the same module set");
        }
        self.processed = true;

        let mut errors = Vec::new();
        self.load_missing_dependencies();
        self.check_headers(&mut errors);
        self.merge_submodules(&mut errors);
        let prefixes = self.prefix_tables(&mut errors);
        let groupings = self.grouping_table();
        self.expand_uses(&groupings, &prefixes, &mut errors);
        self.apply_augments(&prefixes, &mut errors);
        let typedefs = self.typedef_table();
        self.check_bodies(&typedefs, &prefixes, &mut errors);
        errors
    }

    /// Attempt to load imports/includes that are not in the set yet, by the
    /// `<name>.sdl` convention against the search path. Failures are not
    /// errors here; unresolved references are reported by the later checks.
    fn load_missing_dependencies(&mut self) {
        let mut attempted: HashSet<String> = HashSet::new();
        loop {
            let mut missing: Vec<String> = Vec::new();
            for module in &self.modules {
                for import in &module.imports {
                    if self.find_module(&import.module).is_none()
                        && !attempted.contains(&import.module)
                        && !missing.contains(&import.module)
                    {
                        missing.push(import.module.clone());
                    }
                }
                for include in &module.includes {
                    if self.find_submodule(&include.submodule).is_none()
                        && !attempted.contains(&include.submodule)
                        && !missing.contains(&include.submodule)
                    {
                        missing.push(include.submodule.clone());
                    }
                }
            }
            if missing.is_empty() {
                return;
            }
            for name in missing {
                attempted.insert(name.clone());
                let file = PathBuf::from(format!("{name}.{SCHEMA_EXT}"));
                match self.read(&file) {
                    Ok(()) => debug!(module = %name, "loaded dependency from search path"),
                    Err(e) => debug!(module = %name, error = %e, "dependency not on search path"),
                }
            }
        }
    }

    fn check_headers(&self, errors: &mut Vec<SchemaError>) {
        for module in &self.modules {
            match module.kind {
                ModuleKind::Module => {
                    if module.namespace.is_none() {
                        errors.push(SchemaError::Semantic {
                            source_name: module.source_name.clone(),
                            line: module.line,
                            message: format!("module '{}' is missing a namespace", module.name),
                        });
                    }
                    if module.prefix.is_none() {
                        errors.push(SchemaError::Semantic {
                            source_name: module.source_name.clone(),
                            line: module.line,
                            message: format!("module '{}' is missing a prefix", module.name),
                        });
                    }
                }
                ModuleKind::Submodule => {
                    if module.belongs_to.is_none() {
                        errors.push(SchemaError::Semantic {
                            source_name: module.source_name.clone(),
                            line: module.line,
                            message: format!(
                                "submodule '{}' is missing a belongs-to",
                                module.name
                            ),
                        });
                    }
                }
            }
            for revision in &module.revisions {
                if !self.revision_re.is_match(&revision.date) {
                    errors.push(SchemaError::InvalidRevision {
                        source_name: module.source_name.clone(),
                        line: revision.line,
                        value: revision.date.clone(),
                    });
                }
            }
        }
    }

    /// Fold each included submodule's typedefs, groupings, and body into the
    /// including module.
    fn merge_submodules(&mut self, errors: &mut Vec<SchemaError>) {
        let mut merges: Vec<(usize, Vec<Typedef>, Vec<Grouping>, Vec<Statement>)> = Vec::new();
        for (idx, module) in self.modules.iter().enumerate() {
            if module.kind != ModuleKind::Module {
                continue;
            }
            for include in &module.includes {
                match self.find_submodule(&include.submodule) {
                    None => errors.push(SchemaError::MissingInclude {
                        source_name: module.source_name.clone(),
                        line: include.line,
                        name: include.submodule.clone(),
                    }),
                    Some(sub) => {
                        if sub.belongs_to.as_deref() != Some(module.name.as_str()) {
                            errors.push(SchemaError::Semantic {
                                source_name: module.source_name.clone(),
                                line: include.line,
                                message: format!(
                                    "submodule '{}' does not belong to module '{}'",
                                    include.submodule, module.name
                                ),
                            });
                            continue;
                        }
                        merges.push((
                            idx,
                            sub.typedefs.clone(),
                            sub.groupings.clone(),
                            sub.body.clone(),
                        ));
                    }
                }
            }
        }
        for (idx, typedefs, groupings, body) in merges {
            let module = &mut self.modules[idx];
            module.typedefs.extend(typedefs);
            module.groupings.extend(groupings);
            module.body.extend(body);
        }
    }

    /// Per-module prefix map: own prefix plus one entry per import.
    fn prefix_tables(&self, errors: &mut Vec<SchemaError>) -> PrefixTables {
        let mut tables: PrefixTables = HashMap::new();
        for module in &self.modules {
            if module.kind != ModuleKind::Module || tables.contains_key(&module.name) {
                continue;
            }
            let mut table = HashMap::new();
            if let Some(prefix) = &module.prefix {
                table.insert(prefix.clone(), module.name.clone());
            }
            for import in &module.imports {
                if self.find_module(&import.module).is_none() {
                    errors.push(SchemaError::MissingImport {
                        source_name: module.source_name.clone(),
                        line: import.line,
                        name: import.module.clone(),
                    });
                    continue;
                }
                if table
                    .insert(import.prefix.clone(), import.module.clone())
                    .is_some()
                {
                    errors.push(SchemaError::Semantic {
                        source_name: module.source_name.clone(),
                        line: import.line,
                        message: format!("duplicate prefix '{}'", import.prefix),
                    });
                }
            }
            tables.insert(module.name.clone(), table);
        }
        tables
    }

    fn grouping_table(&self) -> GroupingTable {
        let mut table = GroupingTable::new();
        for module in &self.modules {
            if module.kind != ModuleKind::Module {
                continue;
            }
            for grouping in &module.groupings {
                table
                    .entry((module.name.clone(), grouping.name.clone()))
                    .or_insert_with(|| grouping.body.clone());
            }
        }
        table
    }

    fn typedef_table(&self) -> TypedefTable {
        let mut table = TypedefTable::new();
        for module in &self.modules {
            if module.kind != ModuleKind::Module {
                continue;
            }
            for typedef in &module.typedefs {
                table
                    .entry((module.name.clone(), typedef.name.clone()))
                    .or_insert_with(|| typedef.base.clone());
            }
        }
        table
    }

    fn expand_uses(
        &mut self,
        groupings: &GroupingTable,
        prefixes: &PrefixTables,
        errors: &mut Vec<SchemaError>,
    ) {
        for idx in 0..self.modules.len() {
            if self.modules[idx].kind != ModuleKind::Module {
                continue;
            }
            let module_name = self.modules[idx].name.clone();
            let source_name = self.modules[idx].source_name.clone();
            let mut body = std::mem::take(&mut self.modules[idx].body);
            let mut stack = Vec::new();
            expand_uses_in(
                &mut body,
                &module_name,
                &source_name,
                groupings,
                prefixes,
                &mut stack,
                errors,
            );
            self.modules[idx].body = body;
        }
    }

    /// Detach `augment` statements from every body and graft their children
    /// onto the addressed node, which may live in an imported module.
    fn apply_augments(&mut self, prefixes: &PrefixTables, errors: &mut Vec<SchemaError>) {
        struct Augment {
            target_module: String,
            path: Vec<String>,
            raw_path: String,
            children: Vec<Statement>,
            source_name: String,
            line: usize,
        }

        let mut augments: Vec<Augment> = Vec::new();
        for module in &mut self.modules {
            if module.kind != ModuleKind::Module {
                continue;
            }
            let module_name = module.name.clone();
            let source_name = module.source_name.clone();
            let body = std::mem::take(&mut module.body);
            let (augment_stmts, kept): (Vec<_>, Vec<_>) =
                body.into_iter().partition(|s| s.keyword == "augment");
            module.body = kept;

            for stmt in augment_stmts {
                let raw_path = match &stmt.argument {
                    Some(arg) => arg.clone(),
                    None => {
                        errors.push(SchemaError::Semantic {
                            source_name: source_name.clone(),
                            line: stmt.line,
                            message: "augment requires a target path".to_string(),
                        });
                        continue;
                    }
                };
                let segments: Vec<&str> = raw_path
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .collect();
                if !raw_path.starts_with('/') || segments.is_empty() {
                    errors.push(SchemaError::Semantic {
                        source_name: source_name.clone(),
                        line: stmt.line,
                        message: format!("invalid augment target path '{raw_path}'"),
                    });
                    continue;
                }
                // The first segment's prefix selects the target module.
                let target_module = match segments[0].split_once(':') {
                    None => module_name.clone(),
                    Some((prefix, _)) => {
                        match prefixes.get(&module_name).and_then(|t| t.get(prefix)) {
                            Some(target) => target.clone(),
                            None => {
                                errors.push(SchemaError::Semantic {
                                    source_name: source_name.clone(),
                                    line: stmt.line,
                                    message: format!("unknown prefix '{prefix}' in augment target"),
                                });
                                continue;
                            }
                        }
                    }
                };
                let path = segments
                    .iter()
                    .map(|s| s.split_once(':').map_or(*s, |(_, n)| n).to_string())
                    .collect();
                augments.push(Augment {
                    target_module,
                    path,
                    raw_path,
                    children: stmt.children,
                    source_name: source_name.clone(),
                    line: stmt.line,
                });
            }
        }

        for augment in augments {
            let target_idx = self.modules.iter().position(|m| {
                m.kind == ModuleKind::Module && m.name == augment.target_module
            });
            let node = target_idx.and_then(|idx| {
                find_node_mut(&mut self.modules[idx].body, &augment.path)
            });
            match node {
                Some(node) => node.children.extend(augment.children),
                None => errors.push(SchemaError::AugmentTargetNotFound {
                    source_name: augment.source_name,
                    line: augment.line,
                    path: augment.raw_path,
                }),
            }
        }
    }

    /// Validate the fully expanded bodies: statement keywords, sibling name
    /// uniqueness, and type resolvability.
    fn check_bodies(
        &self,
        typedefs: &TypedefTable,
        prefixes: &PrefixTables,
        errors: &mut Vec<SchemaError>,
    ) {
        let mut checked: HashSet<&str> = HashSet::new();
        for module in &self.modules {
            if module.kind != ModuleKind::Module || !checked.insert(module.name.as_str()) {
                continue;
            }
            check_nodes(
                &module.body,
                &module.name,
                &module.source_name,
                typedefs,
                prefixes,
                errors,
            );
        }
    }

    /// Resolve a file name: as given first, then against each search-path
    /// directory (direct child, then recursive scan). A bare module name
    /// additionally tries the `.sdl` extension.
    fn resolve_file(&self, file: &Path) -> SchemaResult<PathBuf> {
        if file.is_file() {
            return Ok(file.to_path_buf());
        }
        if file.is_absolute() {
            return Err(SchemaError::FileNotFound(file.to_path_buf()));
        }

        let mut names: Vec<OsString> = vec![file.as_os_str().to_os_string()];
        if file.extension().is_none() {
            names.push(OsString::from(format!("{}.{SCHEMA_EXT}", file.display())));
        }
        for dir in &self.search_path {
            for name in &names {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
            for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file()
                    && names.iter().any(|n| entry.file_name() == n.as_os_str())
                {
                    return Ok(entry.path().to_path_buf());
                }
            }
        }
        Err(SchemaError::FileNotFound(file.to_path_buf()))
    }
}

/// Resolve a possibly prefixed reference to `(owning module, local name)`.
fn resolve_reference(
    reference: &str,
    current_module: &str,
    prefixes: &PrefixTables,
) -> Result<(String, String), String> {
    match reference.split_once(':') {
        None => Ok((current_module.to_string(), reference.to_string())),
        Some((prefix, name)) => match prefixes.get(current_module).and_then(|t| t.get(prefix)) {
            Some(owner) => Ok((owner.clone(), name.to_string())),
            None => Err(format!("unknown prefix '{prefix}'")),
        },
    }
}

fn expand_uses_in(
    statements: &mut Vec<Statement>,
    module_name: &str,
    source_name: &str,
    groupings: &GroupingTable,
    prefixes: &PrefixTables,
    stack: &mut Vec<(String, String)>,
    errors: &mut Vec<SchemaError>,
) {
    let mut i = 0;
    while i < statements.len() {
        if statements[i].keyword == "uses" {
            let stmt = statements.remove(i);
            let reference = match &stmt.argument {
                Some(arg) => arg.clone(),
                None => {
                    errors.push(SchemaError::Semantic {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        message: "uses requires a grouping name".to_string(),
                    });
                    continue;
                }
            };
            let key = match resolve_reference(&reference, module_name, prefixes) {
                Ok(key) => key,
                Err(message) => {
                    errors.push(SchemaError::Semantic {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        message,
                    });
                    continue;
                }
            };
            if stack.contains(&key) {
                errors.push(SchemaError::CircularUses {
                    source_name: source_name.to_string(),
                    line: stmt.line,
                    name: reference,
                });
                continue;
            }
            match groupings.get(&key) {
                None => {
                    errors.push(SchemaError::UnknownGrouping {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        name: reference,
                    });
                    continue;
                }
                Some(body) => {
                    let mut expanded = body.clone();
                    let owner = key.0.clone();
                    stack.push(key);
                    // A grouping's own references resolve in its owning
                    // module's namespace.
                    expand_uses_in(
                        &mut expanded,
                        &owner,
                        source_name,
                        groupings,
                        prefixes,
                        stack,
                        errors,
                    );
                    stack.pop();
                    let expanded_len = expanded.len();
                    let tail = statements.split_off(i);
                    statements.extend(expanded);
                    statements.extend(tail);
                    i += expanded_len;
                }
            }
        } else {
            if matches!(
                statements[i].keyword.as_str(),
                "container" | "list" | "choice" | "case" | "augment"
            ) {
                expand_uses_in(
                    &mut statements[i].children,
                    module_name,
                    source_name,
                    groupings,
                    prefixes,
                    stack,
                    errors,
                );
            }
            i += 1;
        }
    }
}

/// Locate a data node by its name path within a module body.
fn find_node_mut<'a>(
    statements: &'a mut [Statement],
    path: &[String],
) -> Option<&'a mut Statement> {
    let (first, rest) = path.split_first()?;
    let node = statements.iter_mut().find(|s| {
        DATA_KEYWORDS.contains(&s.keyword.as_str())
            && s.argument.as_deref() == Some(first.as_str())
    })?;
    if rest.is_empty() {
        Some(node)
    } else {
        find_node_mut(&mut node.children, rest)
    }
}

fn check_nodes(
    statements: &[Statement],
    module_name: &str,
    source_name: &str,
    typedefs: &TypedefTable,
    prefixes: &PrefixTables,
    errors: &mut Vec<SchemaError>,
) {
    let mut seen: HashSet<&str> = HashSet::new();
    for stmt in statements {
        let name = match &stmt.argument {
            Some(name) => name.as_str(),
            None => {
                errors.push(SchemaError::Semantic {
                    source_name: source_name.to_string(),
                    line: stmt.line,
                    message: format!("'{}' requires a name", stmt.keyword),
                });
                continue;
            }
        };
        match stmt.keyword.as_str() {
            "container" | "list" | "choice" | "case" => {
                if !seen.insert(name) {
                    errors.push(SchemaError::Semantic {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        message: format!("duplicate node name '{name}'"),
                    });
                }
                let nested: Vec<&Statement> = stmt
                    .children
                    .iter()
                    .filter(|c| !NODE_PROPERTY_KEYWORDS.contains(&c.keyword.as_str()))
                    .collect();
                for child in &nested {
                    if !DATA_KEYWORDS.contains(&child.keyword.as_str()) {
                        errors.push(SchemaError::UnknownStatement {
                            source_name: source_name.to_string(),
                            line: child.line,
                            keyword: child.keyword.clone(),
                        });
                    }
                }
                let data_children: Vec<Statement> = stmt
                    .children
                    .iter()
                    .filter(|c| DATA_KEYWORDS.contains(&c.keyword.as_str()))
                    .cloned()
                    .collect();
                check_nodes(
                    &data_children,
                    module_name,
                    source_name,
                    typedefs,
                    prefixes,
                    errors,
                );
            }
            "leaf" | "leaf-list" => {
                if !seen.insert(name) {
                    errors.push(SchemaError::Semantic {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        message: format!("duplicate node name '{name}'"),
                    });
                }
                match stmt.child_arg("type") {
                    None => errors.push(SchemaError::Semantic {
                        source_name: source_name.to_string(),
                        line: stmt.line,
                        message: format!("{} '{name}' is missing a type", stmt.keyword),
                    }),
                    Some(type_name) => resolve_type(
                        type_name,
                        module_name,
                        source_name,
                        stmt.line,
                        typedefs,
                        prefixes,
                        errors,
                    ),
                }
            }
            other => errors.push(SchemaError::UnknownStatement {
                source_name: source_name.to_string(),
                line: stmt.line,
                keyword: other.to_string(),
            }),
        }
    }
}

/// Follow a type reference through typedef chains down to a builtin.
fn resolve_type(
    type_name: &str,
    module_name: &str,
    source_name: &str,
    line: usize,
    typedefs: &TypedefTable,
    prefixes: &PrefixTables,
    errors: &mut Vec<SchemaError>,
) {
    let mut current_module = module_name.to_string();
    let mut current_type = type_name.to_string();
    let mut visited: HashSet<(String, String)> = HashSet::new();

    loop {
        if !current_type.contains(':') && BUILTIN_TYPES.contains(&current_type.as_str()) {
            return;
        }
        let key = match resolve_reference(&current_type, &current_module, prefixes) {
            Ok(key) => key,
            Err(message) => {
                errors.push(SchemaError::Semantic {
                    source_name: source_name.to_string(),
                    line,
                    message,
                });
                return;
            }
        };
        if !visited.insert(key.clone()) {
            errors.push(SchemaError::Semantic {
                source_name: source_name.to_string(),
                line,
                message: format!("circular typedef '{type_name}'"),
            });
            return;
        }
        match typedefs.get(&key) {
            None => {
                errors.push(SchemaError::UnknownType {
                    source_name: source_name.to_string(),
                    line,
                    name: type_name.to_string(),
                });
                return;
            }
            Some(base) => {
                current_module = key.0;
                current_type = base.clone();
            }
        }
    }
}
