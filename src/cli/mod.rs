//! CLI module
//!
//! Command-line driver for the pagination controller.
//!
//! # Commands
//!
//! - `fetch` - Page through a JSON REST endpoint, one record per line
//! - `simulate` - Scroll a headless viewport over an in-memory dataset
//! - `validate` - Check a pager config file and print it with defaults

mod commands;
mod runner;

pub use commands::{Cli, Commands, FetchArgs, OutputFormat, SimulateArgs};
pub use runner::Runner;
