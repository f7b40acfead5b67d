//! Document tree model

use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::domain::path;

/// A decoded configuration tree: mapping, sequence, scalar or tagged value.
///
/// Mappings keep insertion order, which is the order keys are serialized in.
pub type TreeNode = Value;

/// Tag that turns a string scalar into a reference to another file.
pub const DEFAULT_INCLUDE_TAG: &str = "!include";

/// Reserved mapping key carrying provenance of an included subtree.
pub const DEFAULT_MARKER_KEY: &str = "__include__";

/// Reserved spellings used by the include machinery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syntax {
    pub include_tag: String,
    pub marker_key: String,
}

impl Default for Syntax {
    fn default() -> Self {
        Self {
            include_tag: DEFAULT_INCLUDE_TAG.to_string(),
            marker_key: DEFAULT_MARKER_KEY.to_string(),
        }
    }
}

impl Syntax {
    /// Placeholder string that stands in for a written-out subtree.
    pub fn directive(&self, reference: &str) -> String {
        format!("{} {}", self.include_tag, reference)
    }
}

/// A root tree plus the absolute path it was loaded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: TreeNode,
    pub path: PathBuf,
}

impl Document {
    pub fn new(root: TreeNode, path: PathBuf) -> Self {
        Self { root, path }
    }

    /// Directory that relative include references resolve against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn get(&self, dotted: &str) -> Option<&TreeNode> {
        path::get(&self.root, dotted)
    }

    pub fn into_root(self) -> TreeNode {
        self.root
    }
}

/// Short name of a node's shape, used in error messages.
pub fn node_kind(node: &TreeNode) -> &'static str {
    match node {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_reference_when_building_directive_then_prefixes_tag() {
        let syntax = Syntax::default();
        assert_eq!(syntax.directive("sub/a.yml"), "!include sub/a.yml");
    }

    #[test]
    fn given_document_when_asking_base_dir_then_returns_parent() {
        let doc = Document::new(Value::Null, PathBuf::from("/etc/app/main.yml"));
        assert_eq!(doc.base_dir(), Some(Path::new("/etc/app")));
    }
}
