//! Firmware command handlers.

use serde_json::Value;
use tabled::Tabled;

use ecmcli_api::models::Firmware;

use crate::cli::{FirmwareArgs, FirmwareCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

#[derive(Tabled)]
struct FirmwareRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Built")]
    built_at: String,
    #[tabled(rename = "Released")]
    release_date: String,
}

impl From<&Firmware> for FirmwareRow {
    fn from(f: &Firmware) -> Self {
        Self {
            id: f.id.clone(),
            product: f
                .product
                .as_ref()
                .and_then(|p| p.field("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            version: f.version.clone(),
            built_at: f.built_at.clone().unwrap_or_default(),
            release_date: f.release_date.clone().unwrap_or_default(),
        }
    }
}

pub async fn handle(ctx: &Context, args: FirmwareArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(FirmwareCommand::Active) {
        FirmwareCommand::Active => {
            let firmwares = ctx.client.list_firmwares().await?;
            let out =
                output::render_list(global.output, &firmwares, FirmwareRow::from, |f| f.id.clone());
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }
    }
}
