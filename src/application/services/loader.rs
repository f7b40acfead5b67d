//! Include-aware document loading
//!
//! Decodes a file, replaces every `!include <ref>` directive with the decoded
//! content of `<ref>` (relative to the including file's directory), and marks
//! each loaded mapping with its provenance.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{marker, path, Document, DomainError, IncludeMarker, Syntax, TreeNode};
use crate::infrastructure::codec;
use crate::infrastructure::traits::FileSystem;
use crate::util::path::absolutize;

/// Default ceiling on include nesting.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// Loads documents and resolves their include directives.
pub struct IncludeResolver {
    fs: Arc<dyn FileSystem>,
    syntax: Syntax,
    max_depth: usize,
}

impl IncludeResolver {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            syntax: Syntax::default(),
            max_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }

    pub fn with_syntax(mut self, syntax: Syntax) -> Self {
        self.syntax = syntax;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Load a top-level document.
    pub fn load(&self, path: &Path) -> ApplicationResult<Document> {
        self.load_ref(path, None)
    }

    /// Load a document, recording `origin_ref` as the reference it was
    /// included by.
    pub fn load_ref(&self, path: &Path, origin_ref: Option<&str>) -> ApplicationResult<Document> {
        debug!("load: path={}", path.display());
        let mut chain = Vec::new();
        let (fullpath, root) = self.load_file(path, origin_ref, &mut chain)?;
        Ok(Document::new(root, fullpath))
    }

    /// Decode text that is not backed by a file.
    ///
    /// Includes resolve against `base_dir`; the root gets no marker.
    pub fn load_str(&self, text: &str, base_dir: &Path) -> ApplicationResult<TreeNode> {
        let mut tree = codec::decode(text).map_err(|e| ApplicationError::Decode {
            path: base_dir.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut chain = Vec::new();
        self.resolve_directives(&mut tree, base_dir, true, &mut chain)?;
        Ok(tree)
    }

    fn load_file(
        &self,
        path: &Path,
        origin_ref: Option<&str>,
        chain: &mut Vec<PathBuf>,
    ) -> ApplicationResult<(PathBuf, TreeNode)> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::NotFound(path.to_path_buf()));
        }
        // Markers and nested includes use the path as written, so a symlinked
        // include still resolves its own includes next to the link. Cycles are
        // detected on the link target.
        let fullpath = absolutize(path).with_path_context("resolve", path)?;
        let identity = self
            .fs
            .canonicalize(path)
            .or_not_found("canonicalize", path)?;

        if chain.contains(&identity) {
            return Err(DomainError::IncludeCycle(fullpath).into());
        }
        if chain.len() >= self.max_depth {
            return Err(DomainError::IncludeDepthExceeded {
                path: fullpath,
                depth: self.max_depth,
            }
            .into());
        }

        let text = self
            .fs
            .read_to_string(&fullpath)
            .or_not_found("read", &fullpath)?;
        let mut tree = match codec::decode(&text) {
            Ok(Value::Null) => Value::Mapping(Mapping::new()),
            Ok(tree @ Value::Mapping(_)) => tree,
            Ok(other) => {
                return Err(ApplicationError::Decode {
                    path: fullpath,
                    message: format!(
                        "top-level node must be a mapping, found {}",
                        crate::domain::node_kind(&other)
                    ),
                })
            }
            Err(e) => {
                return Err(ApplicationError::Decode {
                    path: fullpath,
                    message: e.to_string(),
                })
            }
        };

        let dir = fullpath
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        chain.push(identity);
        self.resolve_directives(&mut tree, &dir, true, chain)?;
        chain.pop();

        let mark = match origin_ref {
            Some(reference) => IncludeMarker::included(fullpath.clone(), reference),
            None => IncludeMarker::root(fullpath.clone()),
        };
        marker::attach(&mut tree, &self.syntax.marker_key, &mark)?;
        Ok((fullpath, tree))
    }

    /// Replace include directives below `node`.
    ///
    /// Content included inside a sequence, under a foreign tag, or below a key
    /// that is not a path segment (non-string, empty, or dotted) cannot be
    /// addressed by a dotted path, so it is inlined and its markers are
    /// dropped.
    fn resolve_directives(
        &self,
        node: &mut TreeNode,
        dir: &Path,
        addressable: bool,
        chain: &mut Vec<PathBuf>,
    ) -> ApplicationResult<()> {
        if let Some(reference) = self.include_reference(node, dir)? {
            let target = dir.join(&reference);
            debug!("include: {} -> {}", reference, target.display());
            let (_, mut included) = self.load_file(&target, Some(&reference), chain)?;
            if !addressable {
                marker::strip(&mut included, &self.syntax.marker_key);
            }
            *node = included;
            return Ok(());
        }

        match node {
            Value::Mapping(map) => {
                for (key, child) in map.iter_mut() {
                    let addressable = addressable && path::is_segment(key);
                    self.resolve_directives(child, dir, addressable, chain)?;
                }
            }
            Value::Sequence(items) => {
                for item in items.iter_mut() {
                    self.resolve_directives(item, dir, false, chain)?;
                }
            }
            Value::Tagged(tagged) => {
                self.resolve_directives(&mut tagged.value, dir, false, chain)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn include_reference(&self, node: &TreeNode, dir: &Path) -> ApplicationResult<Option<String>> {
        let Value::Tagged(tagged) = node else {
            return Ok(None);
        };
        if tagged.tag != self.syntax.include_tag {
            return Ok(None);
        }
        match &tagged.value {
            Value::String(reference) if !reference.trim().is_empty() => {
                Ok(Some(reference.trim().to_string()))
            }
            other => Err(DomainError::InvalidDirective {
                path: dir.to_path_buf(),
                message: format!(
                    "{} expects a file reference, found {}",
                    self.syntax.include_tag,
                    crate::domain::node_kind(other)
                ),
            }
            .into()),
        }
    }
}
