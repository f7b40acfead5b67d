//! Include markers: provenance records attached to included subtrees
//!
//! A mapping loaded from its own file carries a reserved key whose value is
//! `{fullpath: <absolute path>, value: <reference string or null>}`. The
//! marker is plain tree data, so it survives merges and clones and is
//! removed again when the subtree is written back to its file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::trace;

use crate::domain::document::TreeNode;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path;

/// Provenance of one included subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeMarker {
    /// Dotted path of the marked mapping from the tree root, empty at the root.
    #[serde(skip)]
    pub xpath: String,
    /// File the subtree was loaded from and will be written to.
    pub fullpath: PathBuf,
    /// Reference string as written in the including file, `None` for a
    /// top-level document.
    #[serde(rename = "value")]
    pub origin_ref: Option<String>,
}

impl IncludeMarker {
    pub fn root(fullpath: PathBuf) -> Self {
        Self {
            xpath: String::new(),
            fullpath,
            origin_ref: None,
        }
    }

    pub fn included(fullpath: PathBuf, origin_ref: &str) -> Self {
        Self {
            xpath: String::new(),
            fullpath,
            origin_ref: Some(origin_ref.to_string()),
        }
    }

    fn to_value(&self) -> DomainResult<Value> {
        serde_yaml::to_value(self).map_err(|e| DomainError::InvalidMarker {
            xpath: self.xpath.clone(),
            message: e.to_string(),
        })
    }

    fn from_value(value: &Value, xpath: &str) -> DomainResult<Self> {
        let mut marker: Self =
            serde_yaml::from_value(value.clone()).map_err(|e| DomainError::InvalidMarker {
                xpath: xpath.to_string(),
                message: e.to_string(),
            })?;
        marker.xpath = xpath.to_string();
        Ok(marker)
    }
}

/// Attach `marker` to the mapping `tree` under `key`.
///
/// A mapping that already carries the key was either loaded twice or reused
/// the reserved key in user input; both are rejected.
pub fn attach(tree: &mut TreeNode, key: &str, marker: &IncludeMarker) -> DomainResult<()> {
    let map = tree
        .as_mapping_mut()
        .ok_or_else(|| DomainError::InvalidMarker {
            xpath: marker.xpath.clone(),
            message: "only mappings can carry an include marker".to_string(),
        })?;
    if map.contains_key(key) {
        return Err(DomainError::DuplicateMarker {
            key: key.to_string(),
            path: marker.fullpath.clone(),
        });
    }
    map.insert(Value::from(key), marker.to_value()?);
    Ok(())
}

/// Overwrite (or create) the root marker of `tree`.
pub fn set_root(tree: &mut TreeNode, key: &str, marker: &IncludeMarker) -> DomainResult<()> {
    path::set(tree, key, marker.to_value()?)
}

/// Remove and return the marker carried directly by `map`.
pub fn detach(map: &mut Mapping, key: &str) -> Option<Value> {
    map.shift_remove(key)
}

/// Collect every marker in `tree`, parents before children.
///
/// Only mappings reachable through string keys are visited; sequences are
/// not addressable by a dotted path.
pub fn collect(tree: &TreeNode, key: &str) -> DomainResult<Vec<IncludeMarker>> {
    let mut markers = Vec::new();
    collect_at(tree, key, "", &mut markers)?;
    Ok(markers)
}

fn collect_at(
    node: &TreeNode,
    key: &str,
    xpath: &str,
    markers: &mut Vec<IncludeMarker>,
) -> DomainResult<()> {
    let Some(map) = node.as_mapping() else {
        return Ok(());
    };
    if let Some(record) = map.get(key) {
        trace!(xpath, "marker found");
        markers.push(IncludeMarker::from_value(record, xpath)?);
    }
    for (child_key, child) in map {
        if !path::is_segment(child_key) || !child.is_mapping() {
            continue;
        }
        let Some(name) = child_key.as_str() else {
            continue;
        };
        if name == key {
            continue;
        }
        collect_at(child, key, &join(xpath, name), markers)?;
    }
    Ok(())
}

/// Remove every marker from `tree`.
pub fn strip(tree: &mut TreeNode, key: &str) {
    match tree {
        Value::Mapping(map) => {
            detach(map, key);
            for (_, child) in map.iter_mut() {
                strip(child, key);
            }
        }
        Value::Sequence(items) => items.iter_mut().for_each(|item| strip(item, key)),
        Value::Tagged(tagged) => strip(&mut tagged.value, key),
        _ => {}
    }
}

/// Point every included subtree at a file next to its nearest marked ancestor.
///
/// A marker with a reference gets `fullpath = dir(ancestor.fullpath)/reference`;
/// markers without a reference keep their path. After an overlay or a store
/// to a new location this keeps the include layout relative to the new root.
pub fn rebase(tree: &mut TreeNode, key: &str) -> DomainResult<()> {
    rebase_at(tree, key, "", None)
}

fn rebase_at(node: &mut TreeNode, key: &str, xpath: &str, dir: Option<&Path>) -> DomainResult<()> {
    let Some(map) = node.as_mapping_mut() else {
        return Ok(());
    };

    let mut own_dir = dir.map(Path::to_path_buf);
    if let Some(record) = map.get_mut(key) {
        let mut marker = IncludeMarker::from_value(record, xpath)?;
        if let (Some(reference), Some(parent_dir)) = (&marker.origin_ref, dir) {
            marker.fullpath = parent_dir.join(reference);
            *record = marker.to_value()?;
        }
        own_dir = marker.fullpath.parent().map(Path::to_path_buf);
    }

    for (child_key, child) in map.iter_mut() {
        let Some(name) = child_key.as_str() else {
            continue;
        };
        if name == key {
            continue;
        }
        rebase_at(child, key, &join(xpath, name), own_dir.as_deref())?;
    }
    Ok(())
}

fn join(xpath: &str, name: &str) -> String {
    if xpath.is_empty() {
        name.to_string()
    } else {
        format!("{xpath}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::DEFAULT_MARKER_KEY as KEY;

    fn tree(text: &str) -> TreeNode {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn given_mapping_when_attaching_then_record_has_fullpath_and_value() {
        let mut t = tree("a: 1");
        attach(&mut t, KEY, &IncludeMarker::included("/x/sub.yml".into(), "sub.yml")).unwrap();
        assert_eq!(
            t,
            tree("a: 1\n__include__:\n  fullpath: /x/sub.yml\n  value: sub.yml\n")
        );
    }

    #[test]
    fn given_marked_mapping_when_attaching_again_then_duplicate_marker() {
        let mut t = tree("a: 1");
        let marker = IncludeMarker::root("/x/main.yml".into());
        attach(&mut t, KEY, &marker).unwrap();
        let err = attach(&mut t, KEY, &marker).unwrap_err();
        assert!(matches!(err, DomainError::DuplicateMarker { .. }));
    }

    #[test]
    fn given_nested_markers_when_collecting_then_parents_first_with_xpaths() {
        let t = tree(
            r#"
main:
  sub:
    deeper:
      x: 1
      __include__: {fullpath: /d/l2.yml, value: l2.yml}
    __include__: {fullpath: /d/l1.yml, value: l1.yml}
__include__: {fullpath: /d/main.yml, value: null}
"#,
        );
        let markers = collect(&t, KEY).unwrap();
        let xpaths: Vec<&str> = markers.iter().map(|m| m.xpath.as_str()).collect();
        assert_eq!(xpaths, vec!["", "main.sub", "main.sub.deeper"]);
        assert_eq!(markers[0].origin_ref, None);
        assert_eq!(markers[2].fullpath, PathBuf::from("/d/l2.yml"));
    }

    #[test]
    fn given_malformed_record_when_collecting_then_invalid_marker() {
        let t = tree("__include__: [1, 2]");
        assert!(matches!(
            collect(&t, KEY).unwrap_err(),
            DomainError::InvalidMarker { .. }
        ));
    }

    #[test]
    fn given_markers_when_stripping_then_none_remain() {
        let mut t = tree("a:\n  __include__: {fullpath: /a.yml, value: a.yml}\n  b: 1\n");
        strip(&mut t, KEY);
        assert_eq!(t, tree("a:\n  b: 1\n"));
    }

    #[test]
    fn given_new_root_when_rebasing_then_children_follow_root_directory() {
        let mut t = tree(
            r#"
car:
  sedan:
    SM6: {transmission: cvt}
    __include__: {fullpath: /old/folder/sedan, value: folder/sedan}
  suv:
    inner:
      __include__: {fullpath: /old/folder/deep/x, value: deep/x}
    __include__: {fullpath: /old/folder/suv, value: folder/suv}
__include__: {fullpath: /new/vehicle, value: null}
"#,
        );
        rebase(&mut t, KEY).unwrap();
        let markers = collect(&t, KEY).unwrap();
        let paths: Vec<PathBuf> = markers.into_iter().map(|m| m.fullpath).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/new/vehicle"),
                PathBuf::from("/new/folder/sedan"),
                PathBuf::from("/new/folder/suv"),
                PathBuf::from("/new/folder/deep/x"),
            ]
        );
    }
}
