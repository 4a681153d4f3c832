//! Group command handlers.

use serde_json::{Map, Value};
use tabled::Tabled;

use ecmcli_api::client::API_PREFIX;
use ecmcli_api::models::{Firmware, Group, Related};
use ecmcli_api::record_str;

use crate::cli::{GlobalOpts, GroupsArgs, GroupsCommand};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Firmware")]
    firmware: String,
    #[tabled(rename = "Synced")]
    synced: u64,
    #[tabled(rename = "Online")]
    online: u64,
    #[tabled(rename = "Offline")]
    offline: u64,
}

fn expanded_str(rel: Option<&Related>, key: &str) -> String {
    rel.and_then(|r| r.field(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

impl From<&Group> for GroupRow {
    fn from(g: &Group) -> Self {
        let stats = g.statistics.clone().unwrap_or_default();
        Self {
            name: util::html_to_text(&g.name),
            id: g.id.clone(),
            product: expanded_str(g.product.as_ref(), "name"),
            firmware: expanded_str(g.target_firmware.as_ref(), "version"),
            synced: stats.synched_count,
            online: stats.online_count,
            offline: stats.offline_count,
        }
    }
}

fn firmware_urn(fw: &Firmware) -> String {
    format!("{API_PREFIX}/firmwares/{}/", fw.id)
}

/// Product name of a group, from the expanded field or by URN.
async fn group_product(ctx: &Context, group: &Group) -> Result<String, CliError> {
    match group.product.as_ref() {
        Some(Related::Expanded(obj)) => Ok(obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned()),
        Some(Related::Urn(urn)) => {
            let product = ctx.client.fetch_cached(urn).await?;
            Ok(record_str(&product, "name").to_owned())
        }
        None => Err(CliError::Validation {
            field: "group".into(),
            reason: format!("group {} has no product", group.id),
        }),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: GroupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command.unwrap_or(GroupsCommand::Ls) {
        GroupsCommand::Ls => {
            let groups = ctx.client.list_groups().await?;
            let out = output::render_list(global.output, &groups, GroupRow::from, |g| g.id.clone());
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        GroupsCommand::Create {
            name,
            product,
            firmware,
            in_account,
        } => {
            let product = ctx.client.get_product(&product).await?;
            let product_name = record_str(&product, "name").to_owned();
            let product_urn = record_str(&product, "resource_uri").to_owned();
            let fw = ctx.client.find_firmware(&product_name, &firmware).await?;
            let account_urn = match in_account.as_deref() {
                Some(ident) => Some(util::account_urn(ctx, Some(ident)).await?),
                None => None,
            };
            let created = ctx
                .client
                .create_group(&name, &product_urn, &firmware_urn(&fw), account_urn.as_deref())
                .await?;
            if !global.quiet {
                eprintln!(
                    "✓ Group created: {}",
                    util::label(&name, &ecmcli_api::record_id(&created))
                );
            }
            Ok(())
        }

        GroupsCommand::Delete { group, force } => {
            let group = ctx.client.get_group(&group).await?;
            let label = util::label(&group.name, &group.id);
            if !force && !util::confirm(&format!("Delete group: {label}"), global.yes)? {
                return Err(CliError::Aborted);
            }
            ctx.client.delete_group(&group.id).await?;
            if !global.quiet {
                eprintln!("✓ Group deleted: {label}");
            }
            Ok(())
        }

        GroupsCommand::Edit {
            group,
            name,
            firmware,
        } => {
            let group = ctx.client.get_group(&group).await?;
            let mut changes = Map::new();
            if let Some(name) = name {
                changes.insert("name".into(), Value::String(name));
            }
            if let Some(version) = firmware {
                let product = group_product(ctx, &group).await?;
                let fw = ctx.client.find_firmware(&product, &version).await?;
                changes.insert("target_firmware".into(), Value::String(firmware_urn(&fw)));
            }
            if changes.is_empty() {
                return Err(CliError::Usage("Nothing to change".into()));
            }
            ctx.client.edit_group(&group.id, &changes).await?;
            if !global.quiet {
                eprintln!("✓ Group updated: {}", util::label(&group.name, &group.id));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn row_carries_statistics_and_unescapes_name() {
        let group: Group = serde_json::from_value(json!({
            "id": 9,
            "name": "Stores &amp; Kiosks",
            "statistics": {"synched_count": 4, "online_count": 3, "offline_count": 1},
            "product": {"name": "MBR1400", "resource_uri": "/api/v1/products/1/"},
            "target_firmware": {"version": "6.1.0"},
        }))
        .expect("group");
        let row = GroupRow::from(&group);
        assert_eq!(row.name, "Stores & Kiosks");
        assert_eq!(row.product, "MBR1400");
        assert_eq!(row.firmware, "6.1.0");
        assert_eq!((row.synced, row.online, row.offline), (4, 3, 1));
    }

    #[test]
    fn missing_statistics_are_zero() {
        let group: Group =
            serde_json::from_value(json!({"id": "3", "name": "Empty"})).expect("group");
        let row = GroupRow::from(&group);
        assert_eq!((row.synced, row.online, row.offline), (0, 0, 0));
        assert_eq!(row.product, "");
    }
}
