//! Subcommand definitions.

use clap::Subcommand;

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the worker, stream its output and stop it on Ctrl-C
    Run {
        /// Model to load (defaults to the selected model in settings)
        #[arg(short, long)]
        model: Option<String>,
        /// Print a status line every N milliseconds (0 disables)
        #[arg(long, default_value_t = 5000)]
        status_interval: u64,
    },
    /// Validate the configured interpreter and worker script
    Check,
    /// Download a transcription model (Ctrl-C cancels)
    Download {
        /// Model name, e.g. base or small
        model: String,
    },
    /// View or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show resolved data, settings and log paths
    Paths,
}

/// Settings command variants.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show all current settings
    Show,
    /// Set the interpreter path (or bare command name)
    SetInterpreter {
        /// Path to the Python interpreter, e.g. /usr/bin/python3
        path: String,
    },
    /// Set the worker script path
    SetScript {
        /// Path to the worker's .py entry file
        path: String,
    },
    /// Set the default model
    SetModel {
        /// One of: tiny, base, small, medium, large, turbo
        model: String,
    },
}
