//! Run a router CLI command on one or more routers.

use std::collections::HashMap;

use serde_json::Value;

use ecmcli_api::models::{RemoteResult, Router};

use crate::cli::{CliArgs, GlobalOpts};
use crate::error::CliError;
use crate::session::Context;

use super::util;

const RULE_WIDTH: usize = 80;

fn render_result(router: Option<&Router>, result: &RemoteResult, command: &str) -> String {
    let name = router.map_or("?", |r| r.name.as_str());
    let body = if result.success {
        let data = result.data.as_ref().map(|d| match d {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        match data {
            Some(data) if data == command => "Warning: unsupported firmware".to_owned(),
            Some(data) => htmlescape::decode_html(&data).unwrap_or(data),
            None => String::new(),
        }
    } else {
        format!(
            "Error: {} / {}",
            result.exception.as_deref().unwrap_or("error"),
            result.reason.as_deref().unwrap_or("")
        )
    };
    format!(
        "\n{} ({}):\n{}\n{body}\n{}\n",
        name,
        result.id,
        "=".repeat(RULE_WIDTH),
        "-".repeat(RULE_WIDTH)
    )
}

pub async fn handle(ctx: &Context, args: CliArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    let routers = util::resolve_routers(ctx, &args.routers).await?;
    let command = args.command.join(" ");
    let results = ctx
        .client
        .cli_command(util::session_id(), &util::router_ids(&routers), &command)
        .await?;
    let echoed = format!("{command}\n");
    let by_id: HashMap<&str, &Router> = routers.iter().map(|r| (r.id.as_str(), r)).collect();
    for result in &results {
        println!("{}", render_result(by_id.get(result.id.as_str()).copied(), result, &echoed));
    }
    Ok(())
}
