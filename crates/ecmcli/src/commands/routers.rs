//! Router command handlers.

use serde_json::{Map, Value};
use tabled::Tabled;

use ecmcli_api::models::{Related, Router};
use ecmcli_api::{Query, record_id, record_str};

use crate::cli::{GlobalOpts, OutputFormat, RoutersArgs, RoutersCommand};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

const LOCATION_URL: &str = "https://maps.google.com/maps?q=loc:";

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RouterRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "IP Address")]
    ip: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Since")]
    since: String,
}

impl From<&Router> for RouterRow {
    fn from(r: &Router) -> Self {
        Self {
            name: r.name.clone(),
            id: r.id.clone(),
            ip: r.ip_address.clone().unwrap_or_default(),
            state: r.state.clone().unwrap_or_default(),
            since: r.state_ts.map(output::time_since).unwrap_or_default(),
        }
    }
}

// ── Detail ──────────────────────────────────────────────────────────

/// A related resource, expanded in place or fetched (memoized) by URN.
async fn related(ctx: &Context, rel: Option<&Related>) -> Result<Option<Value>, CliError> {
    match rel {
        None => Ok(None),
        Some(Related::Expanded(obj)) => Ok(Some(Value::Object(obj.clone()))),
        Some(Related::Urn(urn)) => Ok(Some(ctx.client.fetch_cached(urn).await?)),
    }
}

async fn related_label(ctx: &Context, rel: Option<&Related>) -> Result<String, CliError> {
    Ok(related(ctx, rel)
        .await?
        .map(|v| util::label(record_str(&v, "name"), &record_id(&v)))
        .unwrap_or_default())
}

fn entitlements(bindings: Option<&Value>) -> String {
    let names: Vec<&str> = bindings
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|b| {
                    b.pointer("/settings/entitlement/sf_entitlements/0/name")
                        .and_then(Value::as_str)
                })
                .collect()
        })
        .unwrap_or_default();
    if names.is_empty() {
        "None".into()
    } else {
        names.join(", ")
    }
}

fn location_link(loc: &Value) -> Option<String> {
    let lat = loc.get("latitude").and_then(Value::as_f64)?;
    let lon = loc.get("longitude").and_then(Value::as_f64)?;
    Some(format!("{LOCATION_URL}{lat:.6}+{lon:.6}"))
}

fn opt(value: Option<&str>) -> String {
    value.unwrap_or("").to_owned()
}

async fn detail(ctx: &Context, r: &Router) -> Result<String, CliError> {
    let firmware = related(ctx, r.actual_firmware.as_ref())
        .await?
        .map_or_else(|| "Unsupported".to_owned(), |fw| record_str(&fw, "version").to_owned());
    let location = related(ctx, r.last_known_location.as_ref())
        .await?
        .and_then(|loc| location_link(&loc))
        .unwrap_or_default();
    let bindings = related(ctx, r.featurebindings.as_ref()).await?;
    let joined = r
        .create_ts
        .map(|ts| format!("{} ago", output::time_since(ts)))
        .unwrap_or_default();

    let fields: Vec<(&str, String)> = vec![
        ("Account", related_label(ctx, r.account.as_ref()).await?),
        ("Asset ID", opt(r.asset_id.as_deref())),
        ("Config Status", opt(r.config_status.as_deref())),
        ("Custom 1", opt(r.custom1.as_deref())),
        ("Custom 2", opt(r.custom2.as_deref())),
        ("Description", opt(r.desc.as_deref())),
        ("Entitlements", entitlements(bindings.as_ref())),
        ("Firmware", firmware),
        ("Group", related_label(ctx, r.group.as_ref()).await?),
        ("ID", r.id.clone()),
        ("IP Address", opt(r.ip_address.as_deref())),
        ("Joined", joined),
        ("Locality", opt(r.locality.as_deref())),
        ("Location", location),
        ("MAC", opt(r.mac.as_deref())),
        ("Product", related_label(ctx, r.product.as_ref()).await?),
        (
            "Quarantined",
            r.quarantined.map(|q| q.to_string()).unwrap_or_default(),
        ),
        ("Serial Number", opt(r.serial_number.as_deref())),
        (
            "Connection Time",
            r.state_ts.map(output::time_since).unwrap_or_default(),
        ),
        ("Connection", opt(r.state.as_deref())),
    ];
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0) + 2;
    let mut lines = vec![format!("{} ({}):", r.name, r.id)];
    lines.extend(
        fields
            .into_iter()
            .map(|(k, v)| format!("    {k:<width$}: {v}")),
    );
    Ok(lines.join("\n"))
}

async fn print_routers(
    ctx: &Context,
    routers: &[Router],
    long: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let out = if long && global.output == OutputFormat::Table {
        let mut blocks = Vec::with_capacity(routers.len());
        for r in routers {
            blocks.push(detail(ctx, r).await?);
        }
        blocks.join("\n\n")
    } else {
        output::render_list(global.output, routers, RouterRow::from, |r| r.id.clone())
    };
    output::print_paged(&out, global.quiet, global.no_pager);
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: RoutersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.unwrap_or(RoutersCommand::Ls {
        patterns: Vec::new(),
        long: false,
    });
    match command {
        RoutersCommand::Ls { patterns, long } => {
            let routers = ctx.client.list_routers(&patterns, Query::new()).await?;
            print_routers(ctx, &routers, long, global).await
        }

        RoutersCommand::Edit {
            router,
            name,
            desc,
            asset_id,
            custom1,
            custom2,
        } => {
            let router = ctx.client.get_router(&router).await?;
            let mut changes = Map::new();
            for (key, value) in [
                ("name", name),
                ("desc", desc),
                ("asset_id", asset_id),
                ("custom1", custom1),
                ("custom2", custom2),
            ] {
                if let Some(value) = value {
                    changes.insert(key.to_owned(), Value::String(value));
                }
            }
            if changes.is_empty() {
                return Err(CliError::Usage("Nothing to change".into()));
            }
            ctx.client.edit_router(&router.id, &changes).await?;
            if !global.quiet {
                eprintln!("✓ Router updated: {}", util::label(&router.name, &router.id));
            }
            Ok(())
        }

        RoutersCommand::Move { router, account } => {
            let router = ctx.client.get_router(&router).await?;
            let account = ctx.client.get_account(&account).await?;
            ctx.client
                .move_router(&router.id, &account.resource_uri)
                .await?;
            if !global.quiet {
                eprintln!(
                    "✓ Moved {} to {}",
                    util::label(&router.name, &router.id),
                    util::label(&account.name, &account.id)
                );
            }
            Ok(())
        }

        RoutersCommand::Delete { router, force } => {
            let router = ctx.client.get_router(&router).await?;
            let label = util::label(&router.name, &router.id);
            if !force && !util::confirm(&format!("Delete router: {label}"), global.yes)? {
                return Err(CliError::Aborted);
            }
            ctx.client.delete_router(&router.id).await?;
            if !global.quiet {
                eprintln!("✓ Router deleted: {label}");
            }
            Ok(())
        }

        RoutersCommand::Search { criteria, long } => {
            let fields = ["name", "desc", "mac", "ip_address", "serial_number", "asset_id"];
            let mut found: Vec<Router> = Vec::new();
            for needle in &criteria {
                let hits = ctx
                    .client
                    .search("routers", &fields, needle, Query::new())
                    .await?;
                for hit in hits {
                    let router: Router = serde_json::from_value(hit)?;
                    if !found.iter().any(|r| r.id == router.id) {
                        found.push(router);
                    }
                }
            }
            print_routers(ctx, &found, long, global).await
        }

        RoutersCommand::Groupassign { router, group } => {
            let router = ctx.client.get_router(&router).await?;
            let group = ctx.client.get_group(&group).await?;
            let urn = group.resource_uri.as_deref().ok_or_else(|| CliError::ApiError {
                code: "missing_resource_uri".into(),
                message: format!("group {} has no resource_uri", group.id),
                status: 0,
            })?;
            ctx.client.assign_router_group(&router.id, Some(urn)).await?;
            if !global.quiet {
                eprintln!(
                    "✓ Assigned {} to group {}",
                    util::label(&router.name, &router.id),
                    util::label(&group.name, &group.id)
                );
            }
            Ok(())
        }

        RoutersCommand::Groupunassign { router } => {
            let router = ctx.client.get_router(&router).await?;
            ctx.client.assign_router_group(&router.id, None).await?;
            if !global.quiet {
                eprintln!(
                    "✓ Unassigned {} from its group",
                    util::label(&router.name, &router.id)
                );
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
    fn location_links_to_maps() {
        let loc = json!({"latitude": 44.05, "longitude": -123.09});
        assert_eq!(
            location_link(&loc).as_deref(),
            Some("https://maps.google.com/maps?q=loc:44.050000+-123.090000")
        );
        assert_eq!(location_link(&json!({})), None);
    }

    #[test]
    fn entitlements_are_named_or_none() {
        let bindings = json!([
            {"settings": {"entitlement": {"sf_entitlements": [{"name": "Prime"}]}}},
            {"settings": {"entitlement": {"sf_entitlements": [{"name": "Support"}]}}},
        ]);
        assert_eq!(entitlements(Some(&bindings)), "Prime, Support");
        assert_eq!(entitlements(None), "None");
        assert_eq!(entitlements(Some(&json!([]))), "None");
    }

    #[test]
    fn row_shows_state_and_address() {
        let router: Router = serde_json::from_value(json!({
            "id": 12,
            "name": "hq-1",
            "state": "online",
            "ip_address": "10.0.0.1",
        }))
        .expect("router");
        let row = RouterRow::from(&router);
        assert_eq!(row.id, "12");
        assert_eq!(row.ip, "10.0.0.1");
        assert_eq!(row.state, "online");
        assert_eq!(row.since, "");
    }
}
