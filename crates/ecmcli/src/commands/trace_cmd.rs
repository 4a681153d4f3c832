//! API trace toggle.

use crate::cli::{GlobalOpts, TraceArgs, TraceCommand};
use crate::error::CliError;
use crate::session::Context;

pub fn handle(ctx: &Context, args: TraceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let message = match args.command {
        Some(TraceCommand::Enable) => {
            ctx.trace.enable(&ctx.client, ctx.color)?;
            "Trace Enabled"
        }
        Some(TraceCommand::Disable) => {
            ctx.trace.disable(&ctx.client)?;
            "Trace Disabled"
        }
        None if ctx.trace.is_enabled() => {
            ctx.trace.disable(&ctx.client)?;
            "Trace Disabled"
        }
        None => {
            ctx.trace.enable(&ctx.client, ctx.color)?;
            "Trace Enabled"
        }
    };
    if !global.quiet {
        eprintln!("{message}");
    }
    Ok(())
}
