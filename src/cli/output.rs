//! Colored terminal messages. Data goes to stdout, diagnostics to stderr.
//!
//! `colored` honors NO_COLOR and CLICOLOR_FORCE.

use std::error::Error;
use std::fmt::Display;

use colored::Colorize;

/// Print an error and its chain of causes to stderr.
///
/// Wrapper layers display their inner error verbatim, so a cause is only
/// printed when its text differs from the line above.
pub fn error(err: &dyn Error) {
    let mut last = err.to_string();
    eprintln!("{}: {}", "error".red().bold(), last);
    let mut cause = err.source();
    while let Some(e) = cause {
        let text = e.to_string();
        if text != last {
            eprintln!("  {} {}", "caused by:".red(), text);
            last = text;
        }
        cause = e.source();
    }
}

pub fn warning(msg: &(impl Display + ?Sized)) {
    eprintln!("{}: {}", "warning".yellow(), msg);
}

/// A file written by `set` or `merge`.
pub fn written(path: &(impl Display + ?Sized)) {
    println!("{} {}", "wrote".green(), path);
}

pub fn section(title: &str) {
    println!("{}", title.cyan().bold());
}

/// One `name: value` line under a section, name padded to line up.
pub fn entry(name: &str, value: &(impl Display + ?Sized)) {
    println!("  {:<8}{}", format!("{name}:"), value);
}

/// Plain line, no color.
pub fn line(msg: &(impl Display + ?Sized)) {
    println!("{msg}");
}
