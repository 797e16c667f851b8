//! CLI module - command-line interface
//!
//! Contains the interactive REPL.

pub mod repl;

pub use repl::Repl;
