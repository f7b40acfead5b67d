//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Environment)
//! but are themselves concrete structs, not traits.

mod config_tree;
mod expand;
mod loader;
mod store;

pub use config_tree::ConfigTree;
pub use expand::VariableExpander;
pub use loader::{IncludeResolver, DEFAULT_MAX_INCLUDE_DEPTH};
pub use store::Splitter;
