//! Router log download and follow.

use std::collections::HashSet;
use std::time::Duration;

use chrono::DateTime;
use serde_json::Value;

use ecmcli_api::models::{LogEntry, Router};

use crate::cli::{GlobalOpts, LogsArgs};
use crate::error::CliError;
use crate::output;
use crate::session::Context;

use super::util;

/// Identity of a log line across polls.
type SeenKey = (String, String, String);

fn seen_key(entry: &LogEntry) -> SeenKey {
    (
        entry.timestamp_text(),
        entry.source.clone(),
        entry.message.clone(),
    )
}

fn timestamp(entry: &LogEntry) -> String {
    match &entry.timestamp {
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| {
                #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
                let millis = (secs * 1000.0).round() as i64;
                DateTime::from_timestamp_millis(millis)
            })
            .map_or_else(|| n.to_string(), |ts| output::format_ts(Some(ts))),
        _ => entry.timestamp_text(),
    }
}

fn format_entry(entry: &LogEntry) -> String {
    let message = htmlescape::decode_html(&entry.message).unwrap_or_else(|_| entry.message.clone());
    format!(
        "{} [{:>8}] [{:>16}] {message}",
        timestamp(entry),
        entry.levelname,
        entry.source
    )
}

fn sorted(mut entries: Vec<LogEntry>) -> Vec<LogEntry> {
    entries.sort_by(|a, b| {
        let (ak, at) = a.timestamp_key();
        let (bk, bt) = b.timestamp_key();
        ak.total_cmp(&bk).then_with(|| at.cmp(&bt))
    });
    entries
}

/// Entries not seen before, marking them seen.
fn fresh(entries: Vec<LogEntry>, seen: &mut HashSet<SeenKey>) -> Vec<LogEntry> {
    sorted(entries)
        .into_iter()
        .filter(|e| seen.insert(seen_key(e)))
        .collect()
}

async fn follow(ctx: &Context, routers: &[Router], interval: Duration) -> Result<(), CliError> {
    let mut seen: Vec<HashSet<SeenKey>> = vec![HashSet::new(); routers.len()];
    loop {
        for (router, seen) in routers.iter().zip(seen.iter_mut()) {
            let entries = ctx.client.router_logs(&router.id).await?;
            for entry in fresh(entries, seen) {
                if routers.len() > 1 {
                    println!("{}: {}", router.name, format_entry(&entry));
                } else {
                    println!("{}", format_entry(&entry));
                }
            }
        }
        tokio::time::sleep(interval).await;
    }
}

pub async fn handle(ctx: &Context, args: LogsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let routers = util::resolve_routers(ctx, &args.routers).await?;
    if args.follow {
        if !(args.interval.is_finite() && args.interval > 0.0) {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be a positive number of seconds".into(),
            });
        }
        return follow(ctx, &routers, Duration::from_secs_f64(args.interval)).await;
    }

    let mut blocks = Vec::with_capacity(routers.len());
    for router in &routers {
        let entries = sorted(ctx.client.router_logs(&router.id).await?);
        let mut lines = vec![format!(
            "Logs for Router: {}",
            util::label(&router.name, &router.id)
        )];
        lines.extend(entries.iter().map(format_entry));
        blocks.push(lines.join("\n"));
    }
    output::print_paged(&blocks.join("\n"), global.quiet, global.no_pager);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn entry(ts: Value, source: &str, message: &str) -> LogEntry {
        serde_json::from_value(json!({
            "timestamp": ts,
            "levelname": "INFO",
            "source": source,
            "message": message,
        }))
        .expect("log entry")
    }

    #[test]
    fn entry_format_pads_level_and_source() {
        let line = format_entry(&entry(json!("2024-01-02 03:04:05"), "wan", "link &lt;up&gt;"));
        assert_eq!(
            line,
            "2024-01-02 03:04:05 [    INFO] [             wan] link <up>"
        );
    }

    #[test]
    fn epoch_timestamps_render_as_dates() {
        let line = format_entry(&entry(json!(0), "sys", "boot"));
        assert!(line.starts_with("1970-01-01 00:00:00 "), "{line}");
    }

    #[test]
    fn follow_dedupes_across_polls() {
        let mut seen = HashSet::new();
        let first = fresh(
            vec![entry(json!(2), "a", "two"), entry(json!(1), "a", "one")],
            &mut seen,
        );
        assert_eq!(
            first.iter().map(|e| e.message.as_str()).collect::<Vec<_>>(),
            ["one", "two"]
        );
        let second = fresh(
            vec![
                entry(json!(1), "a", "one"),
                entry(json!(2), "a", "two"),
                entry(json!(3), "a", "three"),
            ],
            &mut seen,
        );
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].message, "three");
    }
}
