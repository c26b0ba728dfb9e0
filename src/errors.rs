//! Schema-library errors (parse and semantic diagnostics)

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading and processing schema sources.
///
/// Parse and semantic variants carry the source name and line so that a
/// batch prints as conventional `source:line: message` diagnostics.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{source_name}:{line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("{source_name}:{line}: imported module not found: {name}")]
    MissingImport {
        source_name: String,
        line: usize,
        name: String,
    },

    #[error("{source_name}:{line}: included submodule not found: {name}")]
    MissingInclude {
        source_name: String,
        line: usize,
        name: String,
    },

    #[error("{source_name}:{line}: unknown statement: {keyword}")]
    UnknownStatement {
        source_name: String,
        line: usize,
        keyword: String,
    },

    #[error("{source_name}:{line}: unknown type: {name}")]
    UnknownType {
        source_name: String,
        line: usize,
        name: String,
    },

    #[error("{source_name}:{line}: unknown grouping: {name}")]
    UnknownGrouping {
        source_name: String,
        line: usize,
        name: String,
    },

    #[error("{source_name}:{line}: circular uses of grouping: {name}")]
    CircularUses {
        source_name: String,
        line: usize,
        name: String,
    },

    #[error("{source_name}:{line}: augment target not found: {path}")]
    AugmentTargetNotFound {
        source_name: String,
        line: usize,
        path: String,
    },

    #[error("{source_name}:{line}: invalid revision date: {value}")]
    InvalidRevision {
        source_name: String,
        line: usize,
        value: String,
    },

    #[error("{source_name}:{line}: {message}")]
    Semantic {
        source_name: String,
        line: usize,
        message: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
