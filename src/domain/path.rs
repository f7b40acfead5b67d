//! Dotted-path access into a document tree
//!
//! `a.b.c` addresses `tree["a"]["b"]["c"]`. Literal dots in keys cannot be
//! escaped.

use serde_yaml::{Mapping, Value};

use crate::domain::document::{node_kind, TreeNode};
use crate::domain::error::{DomainError, DomainResult};

/// Whether `key` can appear as one segment of a dotted path.
pub fn is_segment(key: &Value) -> bool {
    key.as_str().is_some_and(|k| !k.is_empty() && !k.contains('.'))
}

/// Look up a dotted path. Absence at any segment yields `None`.
pub fn get<'a>(tree: &'a TreeNode, dotted: &str) -> Option<&'a TreeNode> {
    dotted
        .split('.')
        .try_fold(tree, |node, key| node.as_mapping()?.get(key))
}

/// Look up a dotted path, falling back to `default` when any segment is absent.
pub fn get_or<'a>(tree: &'a TreeNode, dotted: &str, default: &'a TreeNode) -> &'a TreeNode {
    get(tree, dotted).unwrap_or(default)
}

pub fn get_mut<'a>(tree: &'a mut TreeNode, dotted: &str) -> Option<&'a mut TreeNode> {
    dotted
        .split('.')
        .try_fold(tree, |node, key| node.as_mapping_mut()?.get_mut(key))
}

/// Like [`get_mut`], but the empty path addresses the root itself.
pub fn locate_mut<'a>(tree: &'a mut TreeNode, xpath: &str) -> Option<&'a mut TreeNode> {
    if xpath.is_empty() {
        Some(tree)
    } else {
        get_mut(tree, xpath)
    }
}

/// Assign `value` at a dotted path.
///
/// Missing intermediate segments are created as empty mappings. The last
/// segment is overwritten whatever it held before. Descending through a
/// non-mapping fails with [`DomainError::TypeMismatch`].
pub fn set(tree: &mut TreeNode, dotted: &str, value: TreeNode) -> DomainResult<()> {
    let keys: Vec<&str> = dotted.split('.').collect();
    let (last, parents) = keys
        .split_last()
        .ok_or_else(|| DomainError::MissingKey(dotted.to_string()))?;

    let mut node = tree;
    for (depth, key) in parents.iter().enumerate() {
        let found = node_kind(node);
        let map = node
            .as_mapping_mut()
            .ok_or_else(|| mismatch(&keys[..depth], found))?;
        node = map
            .entry(Value::from(*key))
            .or_insert(Value::Mapping(Mapping::new()));
    }

    let found = node_kind(node);
    let map = node
        .as_mapping_mut()
        .ok_or_else(|| mismatch(parents, found))?;
    map.insert(Value::from(*last), value);
    Ok(())
}

fn mismatch(prefix: &[&str], found: &'static str) -> DomainError {
    DomainError::TypeMismatch {
        path: prefix.join("."),
        expected: "mapping",
        found,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> TreeNode {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn given_nested_key_when_getting_then_returns_value() {
        let t = tree("a:\n  b:\n    c: 1\n");
        assert_eq!(get(&t, "a.b.c"), Some(&Value::from(1)));
    }

    #[test]
    fn given_missing_segment_when_getting_with_default_then_returns_default() {
        let t = tree("a:\n  b: 1\n");
        let default = Value::from("D");
        assert_eq!(get_or(&t, "a.x.c", &default), &default);
        assert_eq!(get_or(&t, "a.b.c", &default), &default);
    }

    #[test]
    fn given_empty_tree_when_setting_deep_path_then_creates_mappings() {
        let mut t = Value::Mapping(Mapping::new());
        set(&mut t, "car.suv.QM6.transmission", Value::from("cvt")).unwrap();
        assert_eq!(t, tree("car:\n  suv:\n    QM6:\n      transmission: cvt\n"));
    }

    #[test]
    fn given_subtree_when_setting_scalar_then_replaces_subtree() {
        let mut t = tree("a:\n  b:\n    c: 1\n");
        set(&mut t, "a.b", Value::from(2)).unwrap();
        assert_eq!(t, tree("a:\n  b: 2\n"));
    }

    #[test]
    fn given_scalar_mid_path_when_setting_then_type_mismatch() {
        let mut t = tree("a: 1\n");
        let err = set(&mut t, "a.b.c", Value::from(2)).unwrap_err();
        match err {
            DomainError::TypeMismatch { path, found, .. } => {
                assert_eq!(path, "a");
                assert_eq!(found, "number");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_empty_xpath_when_locating_then_returns_root() {
        let mut t = tree("a: 1\n");
        let expected = t.clone();
        assert_eq!(locate_mut(&mut t, "").map(|n| n.clone()), Some(expected));
    }
}
