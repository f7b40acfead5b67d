//! Domain-level errors (no external dependencies)

use std::path::PathBuf;
use thiserror::Error;

/// Domain errors represent violations of the tree model's rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("reserved key '{key}' already present in {path}")]
    DuplicateMarker { key: String, path: PathBuf },

    #[error("include target written twice with different content: {0}")]
    AlreadyMarked(PathBuf),

    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot render {kind} at '{path}' as text")]
    UnsupportedType { path: String, kind: &'static str },

    #[error("expansion did not settle after {passes} passes: {input}")]
    LoopLimitExceeded { passes: usize, input: String },

    #[error("include cycle detected at: {0}")]
    IncludeCycle(PathBuf),

    #[error("include depth {depth} exceeded at: {path}")]
    IncludeDepthExceeded { path: PathBuf, depth: usize },

    #[error("invalid include directive in {path}: {message}")]
    InvalidDirective { path: PathBuf, message: String },

    #[error("invalid include marker at '{xpath}': {message}")]
    InvalidMarker { xpath: String, message: String },

    #[error("no value at '{0}'")]
    MissingKey(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
