//! Router reboot.

use crate::cli::{GlobalOpts, RebootArgs};
use crate::error::CliError;
use crate::session::Context;

use super::util;

pub async fn handle(ctx: &Context, args: RebootArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let routers = util::resolve_routers(ctx, &args.routers).await?;
    if routers.is_empty() {
        return Err(CliError::Usage("No routers to reboot".into()));
    }
    let labels: Vec<String> = routers
        .iter()
        .map(|r| format!("    {}", util::label(&r.name, &r.id)))
        .collect();
    if !args.force {
        let prompt = format!("Reboot {} router(s)?\n{}\n", routers.len(), labels.join("\n"));
        if !util::confirm(&prompt, global.yes)? {
            return Err(CliError::Aborted);
        }
    }
    println!("Rebooting:");
    for label in &labels {
        println!("{label}");
    }
    ctx.client.reboot(&util::router_ids(&routers)).await?;
    Ok(())
}
