//! Command dispatch: bridges CLI args -> ECM API calls -> output formatting.

pub mod accounts;
pub mod activity_log;
pub mod alerts;
pub mod apps;
pub mod authorizations;
pub mod cli_cmd;
pub mod clients;
pub mod config_cmd;
pub mod features;
pub mod firmware;
pub mod flashleds;
pub mod gpio;
pub mod groups;
pub mod logs;
pub mod messages;
pub mod reboot;
pub mod remote;
pub mod routers;
pub mod settings;
pub mod shell;
pub mod tos;
pub mod trace_cmd;
pub mod users;
pub mod util;
pub mod wanrate;
pub mod wifi;

use clap::CommandFactory;

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::CliError;
use crate::session::Context;

/// Print a completion script for `shell` to stdout.
pub fn completion(shell: clap_complete::Shell) {
    clap_complete::generate(shell, &mut Cli::command(), "ecm", &mut std::io::stdout());
}

/// Run any command in an open session, logging in first when the command
/// talks to the service.
pub async fn execute(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completion(args) => {
            completion(args.shell);
            Ok(())
        }
        cmd @ (Command::Login(_) | Command::Logout | Command::Trace(_)) => {
            dispatch(cmd, ctx, global).await
        }
        cmd => {
            ctx.ensure_login().await?;
            tracing::debug!(command = ?cmd, "dispatching command");
            dispatch(cmd, ctx, global).await
        }
    }
}

/// Dispatch a session-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Login(args) => {
            ctx.login(args.username).await?;
            if !global.quiet {
                eprintln!("✓ Logged in as {}", ctx.prompt_label());
            }
            Ok(())
        }
        Command::Logout => {
            ctx.logout();
            if !global.quiet {
                eprintln!("✓ Logged out");
            }
            Ok(())
        }
        Command::Accounts(args) => accounts::handle(ctx, args, global).await,
        Command::Routers(args) => routers::handle(ctx, args, global).await,
        Command::Groups(args) => groups::handle(ctx, args, global).await,
        Command::Users(args) => users::handle(ctx, args, global).await,
        Command::Firmware(args) => firmware::handle(ctx, args, global).await,
        Command::Logs(args) => logs::handle(ctx, args, global).await,
        Command::Wanrate(args) => wanrate::handle(ctx, args, global).await,
        Command::Reboot(args) => reboot::handle(ctx, args, global).await,
        Command::Flashleds(args) => flashleds::handle(ctx, args, global).await,
        Command::Gpio(args) => gpio::handle(ctx, args, global).await,
        Command::Wifi(args) => wifi::handle(ctx, args, global).await,
        Command::Clients(args) => clients::handle(ctx, args, global).await,
        Command::Remote(args) => remote::handle(ctx, args, global).await,
        Command::Features(args) => features::handle(ctx, args, global).await,
        Command::Authorizations(args) => authorizations::handle(ctx, args, global).await,
        Command::Apps(args) => apps::handle(ctx, args, global).await,
        Command::Settings(args) => settings::handle(ctx, args, global).await,
        Command::Cli(args) => cli_cmd::handle(ctx, args, global).await,
        Command::Shell(args) => shell::handle(ctx, args, global).await,
        Command::Alerts => alerts::handle(ctx, global).await,
        Command::ActivityLog(args) => activity_log::handle(ctx, args, global).await,
        Command::Messages(args) => messages::handle(ctx, args, global).await,
        Command::Tos(args) => tos::handle(ctx, args, global).await,
        Command::Trace(args) => trace_cmd::handle(ctx, args, global),
        // Config and Completion are handled before dispatch
        Command::Config(_) | Command::Completion(_) => unreachable!(),
    }
}
