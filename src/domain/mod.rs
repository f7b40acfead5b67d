//! Domain layer: document trees and the pure operations on them
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod error;
pub mod expand;
pub mod marker;
pub mod merge;
pub mod path;

pub use document::{node_kind, Document, Syntax, TreeNode, DEFAULT_INCLUDE_TAG, DEFAULT_MARKER_KEY};
pub use error::{DomainError, DomainResult};
pub use expand::{ExpandOptions, MAX_LOOP_COUNT};
pub use marker::IncludeMarker;
pub use merge::{merge, merge_strict};
