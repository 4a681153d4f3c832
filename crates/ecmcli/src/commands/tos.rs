//! Terms of service review and acceptance.

use std::io::{self, IsTerminal};

use dialoguer::Input;

use ecmcli_api::models::{IdentUser, Message};

use crate::cli::{GlobalOpts, TosArgs, TosCommand};
use crate::error::CliError;
use crate::output;
use crate::session::{Context, prompt_err};

use super::util;

const ACCEPT_WORD: &str = "accept";

/// The TOS text wrapped to the terminal.
fn tos_text(tos: &Message) -> String {
    let html = tos.message.as_deref().unwrap_or_default();
    util::wrap(&util::html_to_text(html), util::terminal_width().saturating_sub(4))
}

fn acceptance_line(user: &IdentUser, color: bool) -> String {
    format!(
        "I, {} {} ({}), do hereby accept the ECM terms of service: {}",
        user.first_name.as_deref().unwrap_or_default(),
        user.last_name.as_deref().unwrap_or_default(),
        user.username,
        output::bold("   X   ", color)
    )
}

fn confirm_acceptance() -> Result<(), CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Usage(
            "Not a terminal: pass --i-accept-the-ecm-terms-of-service to accept".into(),
        ));
    }
    let answer: String = Input::new()
        .with_prompt(format!("Type \"{ACCEPT_WORD}\" to comply with the TOS"))
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    if answer.trim() == ACCEPT_WORD {
        Ok(())
    } else {
        Err(CliError::Aborted)
    }
}

pub async fn handle(ctx: &Context, args: TosArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(TosCommand::Review { download: None }) {
        TosCommand::Review { download } => {
            let tos = ctx.client.terms_of_service().await?;
            if let Some(path) = download {
                std::fs::write(&path, tos.message.as_deref().unwrap_or_default())?;
                if !global.quiet {
                    eprintln!("✓ Terms of service saved to {}", path.display());
                }
            } else {
                output::print_paged(&tos_text(&tos), global.quiet, global.no_pager);
            }
            Ok(())
        }

        TosCommand::Accept { accept } => {
            let tos = ctx.client.terms_of_service().await?;
            println!("{}\n", tos_text(&tos));
            if accept {
                let ident = match ctx.client.ident() {
                    Some(ident) => ident,
                    None => ctx.client.identify().await?,
                };
                println!("{}", acceptance_line(&ident.user, ctx.color));
            } else {
                confirm_acceptance()?;
            }
            ctx.client.accept_tos(&tos).await?;
            if !global.quiet {
                eprintln!("✓ Terms of service accepted");
            }
            Ok(())
        }
    }
}
