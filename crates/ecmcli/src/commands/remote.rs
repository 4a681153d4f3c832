//! Remote router config and status access.

use std::collections::HashMap;

use serde_json::Value;
use tabled::Tabled;

use ecmcli_api::tree::{todict, walk_config};
use ecmcli_api::{RemoteRow, RouterSelection};

use crate::cli::{GlobalOpts, OutputFormat, RemoteArgs, RemoteCommand, SelectorArgs};
use crate::error::CliError;
use crate::output::{self, TreeNode};
use crate::session::Context;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RemoteGetRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Success")]
    success: String,
    #[tabled(rename = "Response")]
    response: String,
}

impl From<&RemoteRow> for RemoteGetRow {
    fn from(row: &RemoteRow) -> Self {
        Self {
            name: row.router.name.clone(),
            id: row.router.id.clone(),
            success: if row.result.success { "yes" } else { "no" }.into(),
            response: response_text(row),
        }
    }
}

// ── Value trees ─────────────────────────────────────────────────────

/// A JSON value as a labelled tree; lists become index-keyed objects.
fn value_tree(label: &str, value: &Value) -> TreeNode {
    match todict(value.clone()) {
        Value::Object(obj) => {
            let mut node = TreeNode::new(label);
            node.children = obj.iter().map(|(k, v)| value_tree(k, v)).collect();
            node
        }
        scalar => TreeNode::new(format!("{label}: {}", output::value_text(&scalar))),
    }
}

fn response_text(row: &RemoteRow) -> String {
    if !row.result.success {
        return format!(
            "ERROR: {}",
            row.result
                .reason
                .as_deref()
                .or(row.result.message.as_deref())
                .unwrap_or("unknown")
        );
    }
    match row.hits.as_slice() {
        [] => String::new(),
        [hit] if !hit.value.is_object() && !hit.value.is_array() => {
            format!("VALUE: {}", output::value_text(&hit.value))
        }
        hits => {
            let nodes: Vec<TreeNode> = hits
                .iter()
                .map(|hit| {
                    let label = if hit.path.is_empty() { "VALUE" } else { &hit.path };
                    value_tree(label, &hit.value)
                })
                .collect();
            output::render_tree(&nodes)
        }
    }
}

fn selection(selector: &SelectorArgs) -> RouterSelection {
    RouterSelection {
        router: selector.router.clone(),
        group: selector.group.clone(),
        account: selector.in_account.clone(),
        product: selector.product.clone(),
        firmware: selector.firmware.clone(),
        disjunction: selector.disjunction,
        skip_offline: selector.skip_offline,
    }
}

fn parse_value(input_data: Option<String>, input_file: Option<&std::path::Path>) -> Result<Value, CliError> {
    match (input_data, input_file) {
        (Some(raw), _) => {
            serde_json::from_str(&raw).map_err(|e| CliError::Usage(format!("Invalid JSON Value: {e}")))
        }
        (None, Some(path)) => util::read_json_file(path),
        (None, None) => Err(CliError::Usage(
            "One of --input-data or --input-file is required".into(),
        )),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(ctx: &Context, args: RemoteArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.unwrap_or(RemoteCommand::Get {
        path: String::new(),
        selector: SelectorArgs::default(),
    });
    match command {
        RemoteCommand::Get { path, selector } => {
            let routers = ctx.client.select_routers(&selection(&selector)).await?;
            let concurrency = selector.concurrency.unwrap_or(ctx.settings.concurrency);
            let rows = ctx.client.remote_get(&path, &routers, concurrency).await?;
            let mut out = output::render_list(global.output, &rows, RemoteGetRow::from, |r| {
                r.router.id.clone()
            });
            if global.output == OutputFormat::Table {
                let worked = rows.iter().filter(|r| r.result.success).count();
                out.push_str(&format!(
                    "\n\nSucceeded: {worked}, failed: {}",
                    rows.len() - worked
                ));
            }
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }

        RemoteCommand::Set {
            path,
            input_data,
            input_file,
            dry_run,
            selector,
        } => {
            let value = parse_value(input_data, input_file.as_deref())?;
            let routers = ctx.client.select_routers(&selection(&selector)).await?;
            if dry_run {
                println!("Would set {path} to {value} on:");
                for r in &routers {
                    println!("    {}", util::label(&r.name, &r.id));
                }
                return Ok(());
            }
            let results = ctx
                .client
                .remote_put(&path, &value, &util::router_ids(&routers))
                .await?;
            let by_id: HashMap<&str, _> = results.iter().map(|r| (r.id.as_str(), r)).collect();
            for r in &routers {
                let status = match by_id.get(r.id.as_str()) {
                    Some(res) if res.success => "okay".to_owned(),
                    Some(res) => format!(
                        "{} {}",
                        res.exception.as_deref().unwrap_or("error"),
                        res.message.as_deref().or(res.reason.as_deref()).unwrap_or("")
                    )
                    .trim_end()
                    .to_owned(),
                    None => "no response".to_owned(),
                };
                println!("{}: {status}", r.name);
            }
            Ok(())
        }

        RemoteCommand::Dtd {
            path,
            product,
            firmware,
        } => {
            let fw = ctx.client.find_firmware(&product, &firmware).await?;
            let dtd = ctx.client.firmware_dtd(&fw).await?;
            let node = walk_config(path.as_deref(), &dtd).ok_or_else(|| CliError::NotFound {
                resource: "DTD path".into(),
                identifier: path.clone().unwrap_or_default(),
            })?;
            let label = path.as_deref().unwrap_or("dtd");
            let out = output::render_single(
                global.output,
                node,
                |v| output::render_tree(&[value_tree(label, v)]),
                output::value_text,
            );
            output::print_paged(&out, global.quiet, global.no_pager);
            Ok(())
        }
    }
}
