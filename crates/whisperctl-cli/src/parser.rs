//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Control the speech-transcription worker from a terminal.
#[derive(Debug, Parser)]
#[command(name = "whisperctl")]
#[command(about = "Launch, monitor and stop the speech-transcription worker")]
#[command(version)]
pub struct Cli {
    /// Use this settings file instead of `<data_root>/config.json`
    #[arg(long = "config", global = true, env = "WHISPERCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Also write logs (and worker output) to a daily file under `<data_root>/logs`
    #[arg(long = "log-to-file", global = true)]
    pub log_to_file: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ConfigCommand;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "whisperctl",
            "--verbose",
            "--config",
            "/tmp/config.json",
            "run",
            "--model",
            "small",
        ]);
        assert!(cli.verbose);
        assert!(!cli.log_to_file);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.json")));
        assert!(matches!(
            cli.command,
            Some(Commands::Run { model: Some(ref m), status_interval: 5000 }) if m == "small"
        ));
    }

    #[test]
    fn test_config_subcommands() {
        let cli = Cli::parse_from(["whisperctl", "config", "set-script", "/srv/ptt.py"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommand::SetScript { ref path }
            }) if path == "/srv/ptt.py"
        ));
    }

    #[test]
    fn test_download_requires_model() {
        assert!(Cli::try_parse_from(["whisperctl", "download"]).is_err());
    }
}
