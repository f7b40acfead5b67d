//! ytree: hierarchical YAML configuration trees
//!
//! Documents can pull in other files with an `!include <path>` directive.
//! Loading resolves the directives and records where every included subtree
//! came from, so the merged tree can later be split back into the same set
//! of files.
//!
//! - [`domain`]: tree model, dotted paths, merge, include markers, expansion
//! - [`application`]: loader, splitter, expander and the [`ConfigTree`] facade
//! - [`infrastructure`]: filesystem/environment traits, YAML codec, wiring
//! - [`cli`]: command-line front-end
//!
//! [`ConfigTree`]: application::services::ConfigTree

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
