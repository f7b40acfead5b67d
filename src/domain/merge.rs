//! Deep merge of an overlay tree onto a base tree.
//!
//! Mappings are merged recursively: keys present in the overlay keep the
//! overlay's value, keys present only in the base are copied in. Anything
//! else (scalars, sequences, a mapping facing a non-mapping) is taken from
//! the overlay unchanged. Sequences are replaced, never concatenated.
//!
//! Both inputs are consumed; the result is built in the overlay's storage,
//! so overlay keys keep their order and base-only keys follow in base order.

use serde_yaml::Value;

use crate::domain::document::{node_kind, TreeNode};
use crate::domain::error::{DomainError, DomainResult};

/// Merge `base` underneath `overlay`; the overlay wins every conflict.
///
/// ```
/// use ytree::domain::merge;
///
/// let overlay: serde_yaml::Value = serde_yaml::from_str("a: {x: 1}").unwrap();
/// let base: serde_yaml::Value = serde_yaml::from_str("a: {y: 2}").unwrap();
/// let merged = merge(overlay, base);
/// assert_eq!(merged, serde_yaml::from_str::<serde_yaml::Value>("a: {x: 1, y: 2}").unwrap());
/// ```
pub fn merge(overlay: TreeNode, base: TreeNode) -> TreeNode {
    match (overlay, base) {
        (Value::Mapping(mut over), Value::Mapping(base)) => {
            for (key, base_value) in base {
                match over.get_mut(&key) {
                    Some(slot) => {
                        let current = std::mem::replace(slot, Value::Null);
                        *slot = merge(current, base_value);
                    }
                    None => {
                        over.insert(key, base_value);
                    }
                }
            }
            Value::Mapping(over)
        }
        (overlay, _) => overlay,
    }
}

/// Like [`merge`], but a mapping facing a non-mapping is an error instead of
/// a silent override.
pub fn merge_strict(overlay: TreeNode, base: TreeNode) -> DomainResult<TreeNode> {
    merge_strict_at(overlay, base, &mut Vec::new())
}

fn merge_strict_at(
    overlay: TreeNode,
    base: TreeNode,
    xpath: &mut Vec<String>,
) -> DomainResult<TreeNode> {
    match (overlay, base) {
        (Value::Mapping(mut over), Value::Mapping(base)) => {
            for (key, base_value) in base {
                match over.get_mut(&key) {
                    Some(slot) => {
                        xpath.push(key.as_str().unwrap_or("?").to_string());
                        let current = std::mem::replace(slot, Value::Null);
                        *slot = merge_strict_at(current, base_value, xpath)?;
                        xpath.pop();
                    }
                    None => {
                        over.insert(key, base_value);
                    }
                }
            }
            Ok(Value::Mapping(over))
        }
        (overlay, base) if overlay.is_mapping() != base.is_mapping() => {
            Err(DomainError::TypeMismatch {
                path: xpath.join("."),
                expected: node_kind(&base),
                found: node_kind(&overlay),
            })
        }
        (overlay, _) => Ok(overlay),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> TreeNode {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn given_disjoint_keys_when_merging_then_contains_union() {
        let merged = merge(tree("a: 1"), tree("b: 2"));
        assert_eq!(merged, tree("a: 1\nb: 2"));
    }

    #[test]
    fn given_conflicting_scalars_when_merging_then_overlay_wins() {
        let merged = merge(tree("a: 1\nb: x"), tree("a: 2\nb: y\nc: z"));
        assert_eq!(merged, tree("a: 1\nb: x\nc: z"));
    }

    #[test]
    fn given_nested_mappings_when_merging_then_merges_recursively() {
        let merged = merge(tree("a: {x: 1}"), tree("a: {y: 2}"));
        assert_eq!(merged, tree("a: {x: 1, y: 2}"));
    }

    #[test]
    fn given_sequences_when_merging_then_overlay_replaces() {
        let merged = merge(tree("items: [3]"), tree("items: [1, 2]"));
        assert_eq!(merged, tree("items: [3]"));
    }

    #[test]
    fn given_scalar_over_mapping_when_merging_then_overlay_wins() {
        let merged = merge(tree("a: 1"), tree("a: {x: 1}"));
        assert_eq!(merged, tree("a: 1"));
    }

    #[test]
    fn given_base_only_keys_when_merging_then_appended_after_overlay_keys() {
        let merged = merge(tree("b: 1\na: 1"), tree("c: 2\na: 2"));
        let keys: Vec<&str> = merged
            .as_mapping()
            .unwrap()
            .keys()
            .filter_map(|k| k.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn given_shape_conflict_when_merging_strictly_then_type_mismatch() {
        let err = merge_strict(tree("a: {b: 1}"), tree("a: {b: {c: 2}}")).unwrap_err();
        match err {
            DomainError::TypeMismatch { path, expected, found } => {
                assert_eq!(path, "a.b");
                assert_eq!(expected, "mapping");
                assert_eq!(found, "number");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn given_compatible_trees_when_merging_strictly_then_same_as_merge() {
        let merged = merge_strict(tree("a: {x: 1}\nl: [1]"), tree("a: {y: 2}\nl: [2]")).unwrap();
        assert_eq!(merged, tree("a: {x: 1, y: 2}\nl: [1]"));
    }
}
