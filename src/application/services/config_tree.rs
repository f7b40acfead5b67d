//! Configuration tree facade
//!
//! Owns one merged tree and the services needed to load, overlay, query,
//! expand and split it back into files.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::application::services::{IncludeResolver, Splitter, VariableExpander};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{marker, merge, node_kind, path, DomainError, IncludeMarker, TreeNode};
use crate::infrastructure::codec::{self, DumpStyle};
use crate::util::path::absolutize;

pub struct ConfigTree {
    resolver: IncludeResolver,
    splitter: Splitter,
    expander: VariableExpander,
    data: TreeNode,
    source: Option<PathBuf>,
}

impl ConfigTree {
    /// Empty tree with no backing file.
    pub fn new(resolver: IncludeResolver, splitter: Splitter, expander: VariableExpander) -> Self {
        Self {
            resolver,
            splitter,
            expander,
            data: Value::Mapping(Mapping::new()),
            source: None,
        }
    }

    pub fn data(&self) -> &TreeNode {
        &self.data
    }

    /// File the current data was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn marker_key(&self) -> &str {
        &self.resolver.syntax().marker_key
    }

    /// Replace the current data with the document at `path`.
    pub fn open(&mut self, path: &Path) -> ApplicationResult<&mut Self> {
        self.loadup(path)?;
        Ok(self)
    }

    pub fn loadup(&mut self, path: &Path) -> ApplicationResult<()> {
        let doc = self.resolver.load(path)?;
        if !is_empty(&self.data) {
            info!("overwriting loaded configuration with {}", doc.path.display());
        }
        self.source = Some(doc.path.clone());
        self.data = doc.into_root();
        Ok(())
    }

    /// Merge the document at `path` on top of the current data.
    ///
    /// The overlay's root marker wins, and every included subtree is
    /// retargeted relative to it, so a later [`store`](Self::store) writes
    /// the whole layout next to the overlay file.
    pub fn overlay(&mut self, path: &Path) -> ApplicationResult<()> {
        let doc = self.resolver.load(path)?;
        debug!("overlay: {}", doc.path.display());
        let base = std::mem::take(&mut self.data);
        self.data = merge(doc.root, base);
        marker::rebase(&mut self.data, self.resolver.syntax().marker_key.as_str())?;
        self.source = Some(doc.path);
        Ok(())
    }

    /// Split the tree back into files.
    ///
    /// With `to`, the root is written to that path and included files follow
    /// it. The tree held by `self` is not modified.
    pub fn store(&self, to: Option<&Path>) -> ApplicationResult<Vec<PathBuf>> {
        let key = self.marker_key().to_string();
        let mut tree = self.data.clone();

        if let Some(target) = to {
            let target = absolutize(target)
                .map_err(|e| ApplicationError::OperationFailed {
                    context: format!("resolve {}", target.display()),
                    source: Box::new(e),
                })?;
            debug!("store: retarget root to {}", target.display());
            marker::set_root(&mut tree, &key, &IncludeMarker::root(target))?;
        }
        let has_root = tree
            .as_mapping()
            .is_some_and(|map| map.contains_key(key.as_str()));
        if !has_root {
            return Err(ApplicationError::MissingTarget);
        }

        marker::rebase(&mut tree, &key)?;
        self.splitter.store(&mut tree)
    }

    /// Value at `dotted`, or `default` when any segment is absent.
    pub fn get<'a>(&'a self, dotted: &str, default: &'a TreeNode) -> &'a TreeNode {
        path::get_or(&self.data, dotted, default)
    }

    pub fn get_opt(&self, dotted: &str) -> Option<&TreeNode> {
        path::get(&self.data, dotted)
    }

    pub fn set(&mut self, dotted: &str, value: TreeNode) -> ApplicationResult<()> {
        Ok(path::set(&mut self.data, dotted, value)?)
    }

    /// Serialize the tree; markers are dropped unless `with_markers`.
    pub fn dump(&self, style: DumpStyle, with_markers: bool) -> ApplicationResult<String> {
        let encoded = if with_markers {
            codec::encode(&self.data, style)
        } else {
            let mut tree = self.data.clone();
            marker::strip(&mut tree, self.marker_key());
            codec::encode(&tree, style)
        };
        encoded.map_err(|e| ApplicationError::Encode {
            message: e.to_string(),
        })
    }

    /// Expand environment and config references in `text` against this tree.
    pub fn expand(&self, text: &str) -> ApplicationResult<String> {
        self.expander.convert(text, Some(&self.data))
    }

    /// Expand the value stored at `dotted`.
    pub fn expand_at(&self, dotted: &str) -> ApplicationResult<String> {
        let value = path::get(&self.data, dotted)
            .ok_or_else(|| DomainError::MissingKey(dotted.to_string()))?;
        match value {
            Value::String(text) => self.expand(text),
            Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => {
                Err(DomainError::UnsupportedType {
                    path: dotted.to_string(),
                    kind: node_kind(value),
                }
                .into())
            }
            scalar => Ok(crate::domain::expand::render(dotted, scalar)?),
        }
    }

    /// Every file that contributed to the tree, parents first.
    pub fn included_files(&self) -> ApplicationResult<Vec<IncludeMarker>> {
        Ok(marker::collect(&self.data, self.marker_key())?)
    }
}

fn is_empty(tree: &TreeNode) -> bool {
    match tree {
        Value::Mapping(map) => map.is_empty(),
        Value::Null => true,
        _ => false,
    }
}
