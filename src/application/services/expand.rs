use std::sync::Arc;

use crate::application::ApplicationResult;
use crate::domain::{expand, ExpandOptions, TreeNode};
use crate::infrastructure::traits::Environment;

/// Placeholder expansion bound to an environment source.
pub struct VariableExpander {
    env: Arc<dyn Environment>,
    options: ExpandOptions,
}

impl VariableExpander {
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self {
            env,
            options: ExpandOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExpandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExpandOptions {
        &self.options
    }

    /// Single pass of `$name` / `${name}` substitution.
    pub fn environ_vars(&self, text: &str) -> String {
        expand::expand_env_refs(
            text,
            |name| self.env.var(name),
            self.options.default.as_deref(),
            self.options.skip_escaped,
        )
    }

    /// Single pass of `@a.b` / `@{a.b}` substitution against `tree`.
    pub fn config_vars(&self, text: &str, tree: &TreeNode) -> ApplicationResult<String> {
        Ok(expand::expand_config_refs(text, tree)?)
    }

    /// Expand both grammars until the text is stable.
    pub fn convert(&self, text: &str, tree: Option<&TreeNode>) -> ApplicationResult<String> {
        Ok(expand::convert(
            text,
            |name| self.env.var(name),
            tree,
            &self.options,
        )?)
    }
}
