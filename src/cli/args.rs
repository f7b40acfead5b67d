//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical YAML configuration trees: include resolution, overlay merge, round-trip file splitting and placeholder expansion
#[derive(Parser, Debug)]
#[command(name = "ytree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: -d info, -dd debug, -ddd trace
    #[arg(short = 'd', long = "debug", action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local settings file (layered over the global one)
    #[arg(short = 'c', long = "config", global = true, value_hint = ValueHint::FilePath, env = "YTREE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved tree
    Dump {
        /// Root document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Documents merged on top, in order
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        overlay: Vec<PathBuf>,
        /// Flow style instead of block style
        #[arg(long)]
        flow: bool,
        /// Keep include markers in the output
        #[arg(long)]
        markers: bool,
    },

    /// Print the value at a dotted path
    Get {
        /// Root document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Dotted path, e.g. database.primary.port
        path: String,
        /// Printed when the path is absent
        #[arg(long)]
        default: Option<String>,
    },

    /// Set the value at a dotted path and write the files back
    Set {
        /// Root document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Dotted path; missing intermediate mappings are created
        path: String,
        /// YAML value, e.g. 42, "[a, b]", "{x: 1}"
        value: String,
    },

    /// Merge an overlay onto a base and write the split layout
    Merge {
        /// Base document
        #[arg(value_hint = ValueHint::FilePath)]
        base: PathBuf,
        /// Overlay document; its values win
        #[arg(value_hint = ValueHint::FilePath)]
        overlay: PathBuf,
        /// Root file to write (default: the overlay file)
        #[arg(long, value_hint = ValueHint::FilePath)]
        to: Option<PathBuf>,
    },

    /// Expand $ENV and @config.path placeholders
    Expand {
        /// Document that @references resolve against
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Text to expand
        #[arg(required_unless_present = "key", conflicts_with = "key")]
        text: Option<String>,
        /// Expand the value stored at this dotted path instead
        #[arg(short, long)]
        key: Option<String>,
    },

    /// List the files of an include graph
    Files {
        /// Root document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Show nesting as a tree
        #[arg(long)]
        tree: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Show config paths
    Path,

    /// Print a commented config template
    Template,
}
