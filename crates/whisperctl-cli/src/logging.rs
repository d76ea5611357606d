//! Tracing subscriber setup.
//!
//! Priority: `RUST_LOG` > `--verbose` > default (`info` for whisperctl,
//! `warn` for dependencies). Logs go to stderr so worker output on stdout
//! stays clean; `--log-to-file` adds a daily-rotated file under
//! `<data_root>/logs`.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use whisperctl_core::logs_dir;

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    // Matches every whisperctl_* crate and the worker output target
    format!("warn,whisperctl={level}")
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and closes the log file.
pub fn init(verbose: bool, log_to_file: bool) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let (file_layer, guard) = if log_to_file {
        match logs_dir() {
            Ok(dir) => {
                let appender = tracing_appender::rolling::daily(dir, "whisperctl");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false) // No ANSI colors in files
                    .compact();
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("Failed to prepare log directory: {e}");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(file_layer)
        .try_init()
        .ok(); // Ignore error if already initialized

    guard
}
