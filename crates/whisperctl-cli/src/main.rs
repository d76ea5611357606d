//! CLI entry point - the composition root.
//!
//! Parses arguments, installs logging, bootstraps the supervisor and
//! dispatches to a handler. Errors are printed with their remediation hint
//! and mapped to an exit code.

use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};

use whisperctl_cli::handlers::run::RunArgs;
use whisperctl_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers, logging};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_to_file);

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let cli_err = err.downcast_ref::<CliError>();
            eprintln!("Error: {err}");
            if let Some(cli_err) = cli_err {
                for line in cli_err.context_lines() {
                    eprintln!("  | {line}");
                }
                if let Some(hint) = cli_err.remediation() {
                    eprintln!("Hint: {hint}");
                }
            }
            let code = cli_err.map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::with_defaults()?.with_config_path(cli.config);
    let ctx = bootstrap(config);

    match command {
        Commands::Run {
            model,
            status_interval,
        } => {
            let args = RunArgs {
                model,
                status_interval: Duration::from_millis(status_interval),
                log_output: cli.log_to_file,
            };
            handlers::run::execute(ctx, args).await?;
        }
        Commands::Check => {
            handlers::check::execute(ctx.store.as_ref()).await?;
        }
        Commands::Download { model } => {
            handlers::download::execute(&ctx.supervisor, &model).await?;
        }
        Commands::Config { command } => {
            handlers::config::execute(&ctx.store, command)?;
        }
        Commands::Paths => {
            handlers::paths::execute(&ctx.store)?;
        }
    }

    Ok(())
}
