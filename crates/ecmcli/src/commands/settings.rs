//! Account and group settings bindings.

use tabled::Tabled;

use ecmcli_api::models::SettingBinding;

use crate::cli::{GlobalOpts, SettingsArgs};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "Setting")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

impl From<&SettingBinding> for SettingRow {
    fn from(b: &SettingBinding) -> Self {
        Self {
            name: b.name().to_owned(),
            value: output::value_text(&b.value),
        }
    }
}

pub async fn handle(ctx: &Context, args: SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (owner, urn) = if let Some(group) = args.group.as_deref() {
        let group = ctx.client.get_group(group).await?;
        (util::label(&group.name, &group.id), group.settings_bindings)
    } else {
        let account = match args.in_account.as_deref() {
            Some(ident) => ctx.client.get_account(ident).await?,
            None => util::own_account(ctx).await?,
        };
        (util::label(&account.name, &account.id), account.settings_bindings)
    };
    let urn = urn.ok_or_else(|| CliError::NotFound {
        resource: "Settings".into(),
        identifier: owner,
    })?;
    let bindings = ctx.client.settings_bindings(&urn).await?;
    let out = output::render_list(global.output, &bindings, SettingRow::from, |b| {
        b.name().to_owned()
    });
    output::print_paged(&out, global.quiet, global.no_pager);
    Ok(())
}
