//! Placeholder expansion in string values
//!
//! Two independent grammars:
//! - environment references: `$name` or `${name}`
//! - config-path references: `@a.b.c` or `@{a.b.c}`
//!
//! [`convert`] alternates both passes until the text stops changing.

use std::sync::OnceLock;

use itertools::Itertools;
use regex::{Captures, Regex};
use serde_yaml::Value;
use tracing::trace;

use crate::domain::document::{node_kind, TreeNode};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path;

/// Default ceiling on expansion passes.
pub const MAX_LOOP_COUNT: usize = 30;

/// Knobs for [`convert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandOptions {
    /// Replacement for unknown environment names; `None` leaves them as written.
    pub default: Option<String>,
    /// Leave `\$name` untouched.
    pub skip_escaped: bool,
    pub max_passes: usize,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            default: None,
            skip_escaped: false,
            max_passes: MAX_LOOP_COUNT,
        }
    }
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\\)?\$(\w+|\{([^}]*)\})").unwrap())
}

fn config_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"@([\w.]+|\{([^}]*)\})").unwrap())
}

/// Name inside a match: the braced body if non-empty, else the bare group.
fn reference_name<'t>(caps: &Captures<'t>, bare: usize, braced: usize) -> &'t str {
    caps.get(braced)
        .filter(|m| !m.as_str().is_empty())
        .or_else(|| caps.get(bare))
        .map_or("", |m| m.as_str())
}

/// Replace `$name` / `${name}` using `lookup`.
pub fn expand_env_refs<F>(input: &str, lookup: F, default: Option<&str>, skip_escaped: bool) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_pattern()
        .replace_all(input, |caps: &Captures| {
            let whole = &caps[0];
            let escape = caps.get(1).map_or("", |m| m.as_str());
            if skip_escaped && !escape.is_empty() {
                return whole.to_string();
            }
            let name = reference_name(caps, 2, 3);
            let replacement = lookup(name)
                .or_else(|| default.map(str::to_string))
                .unwrap_or_else(|| whole[escape.len()..].to_string());
            format!("{escape}{replacement}")
        })
        .into_owned()
}

/// Replace `@a.b` / `@{a.b}` with values found in `tree`.
///
/// Unknown paths are left as written.
pub fn expand_config_refs(input: &str, tree: &TreeNode) -> DomainResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for caps in config_pattern().captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&input[last..whole.start()]);
        let key = reference_name(&caps, 1, 2);
        match path::get(tree, key) {
            Some(value) => out.push_str(&render(key, value)?),
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Flat text for a resolved value; sequences of scalars join with `,`.
pub fn render(key: &str, value: &TreeNode) -> DomainResult<String> {
    match value {
        Value::Sequence(items) => {
            itertools::process_results(items.iter().map(|item| render_scalar(key, item)), |mut it| {
                it.join(",")
            })
        }
        other => render_scalar(key, other),
    }
}

fn render_scalar(key: &str, value: &TreeNode) -> DomainResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok("null".to_string()),
        other => Err(DomainError::UnsupportedType {
            path: key.to_string(),
            kind: node_kind(other),
        }),
    }
}

/// Expand environment then config references until the text is stable.
///
/// Fails with [`DomainError::LoopLimitExceeded`] when the last permitted
/// pass still changed the text.
pub fn convert<F>(
    input: &str,
    lookup: F,
    tree: Option<&TreeNode>,
    options: &ExpandOptions,
) -> DomainResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut current = input.to_string();
    for pass in 1..=options.max_passes {
        let env_expanded = expand_env_refs(
            &current,
            &lookup,
            options.default.as_deref(),
            options.skip_escaped,
        );
        let next = match tree {
            Some(tree) => expand_config_refs(&env_expanded, tree)?,
            None => env_expanded,
        };
        trace!(pass, text = %next, "expansion pass");
        if next == current {
            return Ok(next);
        }
        current = next;
    }
    Err(DomainError::LoopLimitExceeded {
        passes: options.max_passes,
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn env(name: &str) -> Option<String> {
        match name {
            "KEY" => Some("ABC".to_string()),
            "Value" => Some("123".to_string()),
            _ => None,
        }
    }

    #[rstest]
    #[case("ABC", "ABC")]
    #[case("$KEY", "ABC")]
    #[case("$KEY.Value", "ABC.Value")]
    #[case("My$KEY.Value", "MyABC.Value")]
    #[case("${KEY}", "ABC")]
    #[case("My${KEY}.Value", "MyABC.Value")]
    #[case("My$NoKEY.Value", "My$NoKEY.Value")]
    #[case("My${NoKEY}.Value", "My${NoKEY}.Value")]
    #[case("My$KEY_Value", "My$KEY_Value")]
    #[case("My${KEY}_Value", "MyABC_Value")]
    #[case("My${KEY}$Value", "MyABC123")]
    #[case("My${KEY}{value", "MyABC{value")]
    #[case("My$KEY}value", "MyABC}value")]
    fn given_env_reference_when_expanding_then_substitutes(
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(expand_env_refs(input, env, None, false), expected);
    }

    #[test]
    fn given_default_when_name_unknown_then_uses_default() {
        assert_eq!(expand_env_refs("a-$NOPE-b", env, Some("x"), false), "a-x-b");
    }

    #[test]
    fn given_escaped_reference_when_skipping_escaped_then_left_verbatim() {
        assert_eq!(expand_env_refs(r"\$KEY $KEY", env, None, true), r"\$KEY ABC");
        assert_eq!(expand_env_refs(r"\$KEY", env, None, false), r"\ABC");
    }

    #[test]
    fn given_nested_sequence_when_rendering_then_unsupported() {
        let value: TreeNode = serde_yaml::from_str("[[1, 2], 3]").unwrap();
        assert!(matches!(
            render("k", &value),
            Err(DomainError::UnsupportedType { kind: "sequence", .. })
        ));
    }

    #[test]
    fn given_scalars_when_rendering_then_uses_yaml_spelling() {
        let value: TreeNode = serde_yaml::from_str("[a, 1, true, null, 1.5]").unwrap();
        assert_eq!(render("k", &value).unwrap(), "a,1,true,null,1.5");
    }

    #[test]
    fn given_zero_passes_when_converting_then_limit_exceeded() {
        let options = ExpandOptions {
            max_passes: 0,
            ..ExpandOptions::default()
        };
        assert!(matches!(
            convert("plain", env, None, &options),
            Err(DomainError::LoopLimitExceeded { passes: 0, .. })
        ));
    }
}
