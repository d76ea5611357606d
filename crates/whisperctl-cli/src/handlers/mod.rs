//! Command handlers.
//!
//! Handlers are thin: translate CLI input, call the supervisor or the
//! settings store, format the result for the terminal. Errors are returned
//! as [`crate::CliError`] wrapped in `anyhow` so `main` can pick the exit
//! code.

pub mod check;
pub mod config;
pub mod download;
pub mod paths;
pub mod run;
