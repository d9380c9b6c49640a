//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// Module containing the implementation of the `encode` command.
/// This command re-encodes one file with a live progress bar.
pub mod encode;

/// Module containing the implementation of the `info` command.
pub mod info;
