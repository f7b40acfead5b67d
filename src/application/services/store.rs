//! Splitting a merged tree back into its files
//!
//! Every marked mapping is written to its own file. Once written, a
//! subtree that was included by reference is replaced in its parent with the
//! directive string (`!include <ref>`), so the parent file is written with a
//! placeholder instead of the child's content.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_yaml::Value;
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{marker, path, DomainError, Syntax, TreeNode};
use crate::infrastructure::codec::{self, DumpStyle};
use crate::infrastructure::traits::FileSystem;

/// Writes marked subtrees back to their files.
pub struct Splitter {
    fs: Arc<dyn FileSystem>,
    syntax: Syntax,
    style: DumpStyle,
}

impl Splitter {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            syntax: Syntax::default(),
            style: DumpStyle::Block,
        }
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_style(mut self, style: DumpStyle) -> Self {
        self.style = style;
        self
    }

    /// Write every marked subtree of `tree` to its file.
    ///
    /// The tree is left in split form: markers removed and included subtrees
    /// replaced by directive strings. Returns the written files, children
    /// before parents. Writes are independent; a failure leaves files
    /// written so far in place.
    pub fn store(&self, tree: &mut TreeNode) -> ApplicationResult<Vec<PathBuf>> {
        let key = self.syntax.marker_key.as_str();
        let markers = marker::collect(tree, key)?;
        debug!("store: {} marked subtrees", markers.len());

        let mut written: HashMap<PathBuf, String> = HashMap::new();
        let mut order = Vec::new();

        // Children first: a parent must see its children as placeholders.
        for mark in markers.iter().rev() {
            let node = path::locate_mut(tree, &mark.xpath).ok_or_else(|| {
                DomainError::InvalidMarker {
                    xpath: mark.xpath.clone(),
                    message: "marked subtree is no longer present".to_string(),
                }
            })?;
            let map = node
                .as_mapping_mut()
                .ok_or_else(|| DomainError::InvalidMarker {
                    xpath: mark.xpath.clone(),
                    message: "marked subtree is no longer a mapping".to_string(),
                })?;
            marker::detach(map, key);

            let text = codec::encode_file(node, self.style, &self.syntax.include_tag)
                .map_err(|e| ApplicationError::Encode {
                    message: format!("{}: {}", mark.fullpath.display(), e),
                })?;

            match written.get(&mark.fullpath) {
                Some(previous) if *previous == text => {
                    debug!("store: {} already written", mark.fullpath.display());
                }
                Some(_) => return Err(DomainError::AlreadyMarked(mark.fullpath.clone()).into()),
                None => {
                    debug!("store: write {}", mark.fullpath.display());
                    self.fs
                        .ensure_parent(&mark.fullpath)
                        .with_path_context("create parent directory", &mark.fullpath)?;
                    self.fs
                        .write(&mark.fullpath, &text)
                        .with_path_context("write", &mark.fullpath)?;
                    written.insert(mark.fullpath.clone(), text);
                    order.push(mark.fullpath.clone());
                }
            }

            if let (Some(reference), false) = (&mark.origin_ref, mark.xpath.is_empty()) {
                *node = Value::String(self.syntax.directive(reference));
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    fn tree(text: &str) -> TreeNode {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn given_marked_child_when_storing_then_parent_holds_directive() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().display().to_string();
        let mut t = tree(&format!(
            "a:\n  x: 1\n  __include__: {{fullpath: {dir}/a.yml, value: a.yml}}\n__include__: {{fullpath: {dir}/root.yml, value: null}}\n"
        ));

        let written = Splitter::new(Arc::new(RealFileSystem)).store(&mut t).unwrap();

        assert_eq!(
            written,
            vec![temp.path().join("a.yml"), temp.path().join("root.yml")]
        );
        assert_eq!(t, tree("a: '!include a.yml'\n"));
        assert_eq!(
            std::fs::read_to_string(temp.path().join("root.yml")).unwrap(),
            "a: !include a.yml\n"
        );
        assert_eq!(
            std::fs::read_to_string(temp.path().join("a.yml")).unwrap(),
            "x: 1\n"
        );
    }

    #[test]
    fn given_same_target_with_different_content_when_storing_then_already_marked() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().display().to_string();
        let mut t = tree(&format!(
            "a:\n  x: 1\n  __include__: {{fullpath: {dir}/s.yml, value: s.yml}}\nb:\n  x: 2\n  __include__: {{fullpath: {dir}/s.yml, value: s.yml}}\n"
        ));

        let err = Splitter::new(Arc::new(RealFileSystem))
            .store(&mut t)
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::AlreadyMarked(_))
        ));
    }

    #[test]
    fn given_unmarked_tree_when_storing_then_writes_nothing() {
        let mut t = tree("a: 1\n");
        let written = Splitter::new(Arc::new(RealFileSystem)).store(&mut t).unwrap();
        assert!(written.is_empty());
    }
}
