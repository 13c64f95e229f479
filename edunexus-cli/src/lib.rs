//! # edunexus-cli
//!
//! The `edunexus` command: `ingest` builds the textbook index, `ask` (the
//! default) opens the interactive question console.

pub mod app;
pub mod args;
pub mod console;

pub use args::{AskArgs, Cli, Commands, IndexArgs, IngestArgs};
pub use console::{
    ConsoleOptions, EditorSource, Input, LineSource, ReaderSource, parse_input, run_console,
};
