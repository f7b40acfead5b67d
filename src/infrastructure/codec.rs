//! YAML text codec
//!
//! Thin layer over `serde_yaml`: decode text into a tree, encode a tree back
//! to text in block or flow style, and unquote include directives that the
//! emitter had to quote.

use thiserror::Error;

use crate::domain::TreeNode;

/// Codec failures, carrying the underlying library message.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Layout of encoded documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpStyle {
    /// Indented block collections.
    #[default]
    Block,
    /// JSON-compatible flow collections, one entry per line.
    Flow,
}

impl DumpStyle {
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty {
            DumpStyle::Block
        } else {
            DumpStyle::Flow
        }
    }
}

pub fn decode(text: &str) -> Result<TreeNode, CodecError> {
    Ok(serde_yaml::from_str(text)?)
}

pub fn encode(tree: &TreeNode, style: DumpStyle) -> Result<String, CodecError> {
    let text = match style {
        DumpStyle::Block => serde_yaml::to_string(tree)?,
        DumpStyle::Flow => serde_json::to_string_pretty(tree)?,
    };
    Ok(text)
}

/// Encode a tree for writing to disk.
///
/// Lines are right-trimmed and newline-terminated; a quoted `<tag> <ref>`
/// scalar loses its quotes so the file holds a bare directive.
pub fn encode_file(tree: &TreeNode, style: DumpStyle, tag: &str) -> Result<String, CodecError> {
    let text = encode(tree, style)?;
    let mut out = String::with_capacity(text.len());
    for line in text.trim().lines() {
        if line.contains(tag) {
            out.push_str(unquote_directive(line, tag).trim_end());
        } else {
            out.push_str(line.trim_end());
        }
        out.push('\n');
    }
    Ok(out)
}

/// Strip the quotes around a scalar of the form `<tag> <reference>`.
///
/// The tag must be followed by a space, so text such as `'!include-style'`
/// stays quoted.
pub fn unquote_directive(line: &str, tag: &str) -> String {
    for quote in ['\'', '"'] {
        let opening = format!("{quote}{tag} ");
        let Some(start) = line.find(&opening) else {
            continue;
        };
        let body_start = start + quote.len_utf8();
        if let Some(len) = closing_quote(&line[body_start..], quote) {
            let body = &line[body_start..body_start + len];
            let body = if quote == '\'' {
                body.replace("''", "'")
            } else {
                body.to_string()
            };
            let rest = &line[body_start + len + quote.len_utf8()..];
            return format!("{}{}{}", &line[..start], body, rest);
        }
    }
    line.to_string()
}

fn closing_quote(s: &str, quote: char) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
            continue;
        }
        if c == quote {
            if quote == '\'' && matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                continue;
            }
            return Some(i);
        }
    }
    None
}
