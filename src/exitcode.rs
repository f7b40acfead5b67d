//! Process exit codes, taken from BSD `sysexits.h`.
//!
//! `CliError::exit_code` decides which one a failure gets.

pub const OK: i32 = 0;

/// Bad arguments, no command, or `store` without a target file.
pub const USAGE: i32 = 64;

/// A document that fails to decode or cannot be used: include cycles,
/// runaway nesting, malformed directives, a reserved key written by hand.
pub const DATAERR: i32 = 65;

/// The root document or an include target does not exist.
pub const NOINPUT: i32 = 66;

pub const SOFTWARE: i32 = 70;

/// Reading or writing a file failed for a reason other than absence.
pub const IOERR: i32 = 74;

/// The settings files or `YTREE_*` variables are invalid.
pub const CONFIG: i32 = 78;
