//! Command-line front end for the whisperctl worker controller.
//!
//! `main.rs` parses arguments, installs logging and dispatches to the
//! handlers here. Everything a handler needs is built once in
//! [`bootstrap`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, ConfigCommand};
pub use error::CliError;
pub use parser::Cli;
