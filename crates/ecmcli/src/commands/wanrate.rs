//! Live WAN throughput of routers.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use ecmcli_api::models::{RemoteResult, Router};

use crate::cli::{GlobalOpts, WanrateArgs};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

const COLUMN_WIDTH: usize = 20;

fn header(routers: &[Router]) -> String {
    routers
        .iter()
        .map(|r| format!("{:>COLUMN_WIDTH$}", util::label(&r.name, &r.id)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sample_cell(result: Option<&RemoteResult>) -> String {
    let cell = match result {
        Some(r) if r.success => output::format_rate(r.data.as_ref().and_then(Value::as_f64).unwrap_or(0.0)),
        Some(r) => format!("[{}]", r.reason.as_deref().unwrap_or("error")),
        None => "[no data]".to_owned(),
    };
    format!("{cell:>COLUMN_WIDTH$}")
}

fn sample_row(routers: &[Router], results: &[RemoteResult]) -> String {
    let by_id: HashMap<&str, &RemoteResult> = results.iter().map(|r| (r.id.as_str(), r)).collect();
    routers
        .iter()
        .map(|r| sample_cell(by_id.get(r.id.as_str()).copied()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub async fn handle(ctx: &Context, args: WanrateArgs, _global: &GlobalOpts) -> Result<(), CliError> {
    if !(args.sampletime.is_finite() && args.sampletime > 0.0) {
        return Err(CliError::Validation {
            field: "sampletime".into(),
            reason: "must be a positive number of seconds".into(),
        });
    }
    let sampletime = Duration::from_secs_f64(args.sampletime);
    let routers = util::resolve_routers(ctx, &args.routers).await?;
    let ids = util::router_ids(&routers);
    println!("{}", header(&routers));
    loop {
        let start = Instant::now();
        let results = ctx.client.wan_bps(&ids).await?;
        tokio::time::sleep(sampletime.saturating_sub(start.elapsed())).await;
        println!("{}", sample_row(&routers, &results));
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn router(id: &str, name: &str) -> Router {
        serde_json::from_value(json!({"id": id, "name": name})).expect("router")
    }

    #[test]
    fn columns_are_right_aligned() {
        let routers = vec![router("1", "hq"), router("2", "lab")];
        assert_eq!(header(&routers), format!("{:>20}, {:>20}", "hq (1)", "lab (2)"));
    }

    #[test]
    fn failed_samples_show_the_reason() {
        let routers = vec![router("1", "hq"), router("2", "lab")];
        let results: Vec<RemoteResult> = serde_json::from_value(json!([
            {"id": 2, "success": false, "reason": "offline"},
            {"id": 1, "success": true, "data": 0},
        ]))
        .expect("results");
        assert_eq!(
            sample_row(&routers, &results),
            format!("{:>20}, {:>20}", "0 B/s", "[offline]")
        );
    }
}
