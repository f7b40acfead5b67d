//! Command dispatch

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use serde_yaml::Value;
use termtree::Tree;
use tracing::{debug, instrument};

use crate::application::services::ConfigTree;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{expand, marker, DomainError, IncludeMarker, TreeNode};
use crate::infrastructure::codec::{self, DumpStyle};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::display_relative;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see 'ytree --help'".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => cmd_config(cli.config.as_deref(), command),
        command => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings);
            run(&container, command)
        }
    }
}

fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Dump {
            file,
            overlay,
            flow,
            markers,
        } => cmd_dump(container, file, overlay, *flow, *markers),
        Commands::Get {
            file,
            path,
            default,
        } => cmd_get(container, file, path, default.as_deref()),
        Commands::Set { file, path, value } => cmd_set(container, file, path, value),
        Commands::Merge { base, overlay, to } => cmd_merge(container, base, overlay, to.as_deref()),
        Commands::Expand { file, text, key } => {
            cmd_expand(container, file, text.as_deref(), key.as_deref())
        }
        Commands::Files { file, tree } => cmd_files(container, file, *tree),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn open(container: &ServiceContainer, file: &Path) -> CliResult<ConfigTree> {
    let mut tree = container.config_tree();
    tree.loadup(file)?;
    Ok(tree)
}

fn cwd() -> PathBuf {
    std::env::current_dir().unwrap_or_default()
}

fn report_written(files: &[PathBuf]) {
    let base = cwd();
    for file in files {
        output::written(&display_relative(file, &base));
    }
}

fn write_stdout(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| {
            if text.ends_with('\n') {
                Ok(())
            } else {
                stdout.write_all(b"\n")
            }
        })
        .map_err(|e| InfraError::io("write to stdout", e))?;
    Ok(())
}

#[instrument(skip(container))]
fn cmd_dump(
    container: &ServiceContainer,
    file: &Path,
    overlays: &[PathBuf],
    flow: bool,
    markers: bool,
) -> CliResult<()> {
    let mut tree = open(container, file)?;
    for overlay in overlays {
        tree.overlay(overlay)?;
    }
    let style = if flow { DumpStyle::Flow } else { DumpStyle::Block };
    write_stdout(&tree.dump(style, markers)?)
}

#[instrument(skip(container))]
fn cmd_get(
    container: &ServiceContainer,
    file: &Path,
    path: &str,
    default: Option<&str>,
) -> CliResult<()> {
    let tree = open(container, file)?;
    match (tree.get_opt(path), default) {
        (Some(value), _) => write_stdout(&format_value(container, path, value)?),
        (None, Some(default)) => write_stdout(default),
        (None, None) => Err(ApplicationError::from(DomainError::MissingKey(path.to_string())).into()),
    }
}

/// Scalars print bare, collections print as block YAML without markers.
fn format_value(container: &ServiceContainer, path: &str, value: &TreeNode) -> CliResult<String> {
    match value {
        Value::Mapping(_) | Value::Sequence(_) | Value::Tagged(_) => {
            let mut value = value.clone();
            marker::strip(&mut value, &container.settings.marker_key);
            let text = codec::encode(&value, DumpStyle::Block).map_err(|e| {
                ApplicationError::Encode {
                    message: e.to_string(),
                }
            })?;
            Ok(text)
        }
        scalar => Ok(expand::render(path, scalar).map_err(ApplicationError::from)?),
    }
}

#[instrument(skip(container))]
fn cmd_set(container: &ServiceContainer, file: &Path, path: &str, value: &str) -> CliResult<()> {
    let value = codec::decode(value)
        .map_err(|e| CliError::InvalidArgs(format!("value is not valid YAML: {e}")))?;
    let mut tree = open(container, file)?;
    tree.set(path, value)?;
    let written = tree.store(None)?;
    debug!("set {} in {} files", path, written.len());
    report_written(&written);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_merge(
    container: &ServiceContainer,
    base: &Path,
    overlay: &Path,
    to: Option<&Path>,
) -> CliResult<()> {
    let mut tree = open(container, base)?;
    tree.overlay(overlay)?;
    let written = tree.store(to)?;
    report_written(&written);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_expand(
    container: &ServiceContainer,
    file: &Path,
    text: Option<&str>,
    key: Option<&str>,
) -> CliResult<()> {
    let tree = open(container, file)?;
    let expanded = match (text, key) {
        (_, Some(key)) => tree.expand_at(key)?,
        (Some(text), None) => tree.expand(text)?,
        (None, None) => {
            return Err(CliError::Usage("give a text or --key".to_string()));
        }
    };
    write_stdout(&expanded)
}

#[instrument(skip(container))]
fn cmd_files(container: &ServiceContainer, file: &Path, as_tree: bool) -> CliResult<()> {
    let tree = open(container, file)?;
    let markers = tree.included_files()?;
    let base = cwd();
    if as_tree {
        if let Some(view) = include_tree(&markers, &base) {
            write_stdout(&view.to_string())?;
        }
    } else {
        for marker in &markers {
            output::line(&display_relative(&marker.fullpath, &base));
        }
    }
    Ok(())
}

fn label(marker: &IncludeMarker, base: &Path) -> String {
    let file = display_relative(&marker.fullpath, base);
    if marker.xpath.is_empty() {
        file
    } else {
        format!("{} ({})", file, marker.xpath)
    }
}

fn is_ancestor(parent: &str, child: &str) -> bool {
    parent.is_empty() || child.strip_prefix(parent).is_some_and(|rest| rest.starts_with('.'))
}

/// Nest markers (collected parents first) by their xpaths.
fn include_tree(markers: &[IncludeMarker], base: &Path) -> Option<Tree<String>> {
    let mut stack: Vec<(&str, Tree<String>)> = Vec::new();
    for marker in markers {
        while stack.len() > 1
            && !stack
                .last()
                .is_some_and(|(xpath, _)| is_ancestor(xpath, &marker.xpath))
        {
            fold_last(&mut stack);
        }
        stack.push((marker.xpath.as_str(), Tree::new(label(marker, base))));
    }
    while stack.len() > 1 {
        fold_last(&mut stack);
    }
    stack.pop().map(|(_, tree)| tree)
}

fn fold_last(stack: &mut Vec<(&str, Tree<String>)>) {
    if let Some((_, child)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.leaves.push(child);
        }
    }
}

fn cmd_config(local: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            write_stdout(&settings.to_toml()?)
        }
        ConfigCommands::Path => {
            output::section("Settings files");
            match global_config_path() {
                Some(path) => {
                    let state = if path.exists() { "" } else { " (not present)" };
                    output::entry("global", &format!("{}{}", path.display(), state));
                }
                None => output::warning("cannot determine the global config directory"),
            }
            if let Some(path) = local {
                output::entry("local", &path.display());
            }
            Ok(())
        }
        ConfigCommands::Template => write_stdout(&Settings::template()),
    }
}
