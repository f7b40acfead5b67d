//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{ConfigTree, IncludeResolver, Splitter, VariableExpander};
use crate::config::Settings;
use crate::infrastructure::traits::{Environment, FileSystem, RealEnvironment, RealFileSystem};
use crate::infrastructure::DumpStyle;

/// Container holding all application services.
///
/// Services are cheap to build; each accessor returns a fresh instance
/// configured from the shared settings.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Process environment abstraction
    pub env: Arc<dyn Environment>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem), Arc::new(RealEnvironment))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        env: Arc<dyn Environment>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs, env }
    }

    pub fn resolver(&self) -> IncludeResolver {
        IncludeResolver::new(self.fs.clone())
            .with_syntax(self.settings.syntax())
            .with_max_depth(self.settings.max_include_depth)
    }

    pub fn splitter(&self) -> Splitter {
        Splitter::new(self.fs.clone())
            .with_syntax(self.settings.syntax())
            .with_style(DumpStyle::from_pretty(self.settings.store.pretty))
    }

    pub fn expander(&self) -> VariableExpander {
        VariableExpander::new(self.env.clone()).with_options(self.settings.expand_options())
    }

    /// Empty configuration tree wired to this container's services.
    pub fn config_tree(&self) -> ConfigTree {
        ConfigTree::new(self.resolver(), self.splitter(), self.expander())
    }
}
