mod cli;
mod commands;
mod config;
mod error;
mod output;
mod repl;
mod session;
mod trace;

use std::io::{self, IsTerminal};

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::{CliError, exit_code};
use crate::session::Context;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbosity = if cli.global.debug {
        cli.global.verbose.max(2)
    } else {
        cli.global.verbose
    };
    init_tracing(verbosity);

    let code = match run(cli).await {
        Ok(()) => exit_code::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let Cli { global, command } = cli;
    match command {
        // Neither needs a session
        Some(Command::Config(args)) => commands::config_cmd::handle(args, &global),
        Some(Command::Completion(args)) => {
            commands::completion(args.shell);
            Ok(())
        }

        Some(cmd) => {
            let ctx = Context::open(&global)?;
            tokio::select! {
                result = commands::execute(cmd, &ctx, &global) => result,
                _ = tokio::signal::ctrl_c() => Err(CliError::Interrupted),
            }
        }

        None if io::stdin().is_terminal() && io::stdout().is_terminal() => {
            let ctx = Context::open(&global)?;
            repl::run(&ctx, &global).await
        }

        None => {
            Cli::command().write_help(&mut io::stderr())?;
            Err(CliError::Usage("No command given".into()))
        }
    }
}
