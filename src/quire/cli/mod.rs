//! # CLI Layer
//!
//! This module is **one possible UI client** for quire, not the application
//! itself. It is the only place that knows about the terminal: it parses
//! arguments, calls [`quire::api::QuireApi`], prints `CmdResult`s, and turns
//! errors into an exit code.
//!
//! - `setup`: clap definitions and version string
//! - `commands`: `run()` plus one `handle_*` per subcommand
//! - `print`: output formatting

mod commands;
mod print;
mod setup;

pub use commands::run;
